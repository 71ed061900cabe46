//! # Communications interface crate.
//!
//! Provides all common communications interfaces between the flight controller node and the
//! ground/perception side of the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Flight commands published to the flight controller
pub mod flight_cmd;

/// Telemetry (status and detections) received from the platform
pub mod telem;

/// Network module
pub mod net;
