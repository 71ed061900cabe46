//! # Controller library.
//!
//! This library holds everything the controller executable needs to drive the drone from the
//! operator's command language: the command dispatcher, the script interpretation engine, the
//! mission state machine and the collaborators they talk to.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Console - everything shown to the operator
pub mod console;

/// Controller - the data store plus every collaborator, passed through the engine
pub mod controller;

/// Data store - parameters, detection latches and signals shared by the engine
pub mod data_store;

/// Command dispatcher - resolves one token of the command language
pub mod dispatch;

/// Fail-safe recoveries run when a guarded block fails
pub mod fail_safe;

/// GPIO actuator used by the grab and release motors
pub mod gpio;

/// Script interpretation engine
pub mod interp;

/// Link to the flight controller and the perception nodes
pub mod link;

/// Mission state machine
pub mod mission;

/// Executable and flight parameters
pub mod params;

/// Blocking waits which keep the message pump running
pub mod sync;

#[cfg(test)]
pub(crate) mod sim;
