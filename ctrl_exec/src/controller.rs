//! # Controller
//!
//! The controller bundles the data store with every collaborator the engine talks to. It is
//! passed by mutable reference through the dispatcher, the engine and the state machine.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use util::script::ScriptStore;

use crate::{
    console::Console, data_store::DataStore, gpio::Actuator, link::Link, params::GpioParams,
    sync::Clock,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Controller {
    pub ds: DataStore,
    pub link: Box<dyn Link>,
    pub actuator: Box<dyn Actuator>,
    pub clock: Box<dyn Clock>,
    pub console: Box<dyn Console>,
    pub scripts: Box<dyn ScriptStore>,

    /// Names of the motor outputs
    pub outputs: MotorOutputs,

    /// Maximum number of stacked frames
    pub max_depth: usize,

    /// Number of frames currently running, across nested engine runs
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct MotorOutputs {
    pub grab: String,
    pub release: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Controller {
    /// Message pump: merge all pending telemetry into the data store.
    pub fn pump(&mut self) {
        for msg in self.link.poll() {
            self.ds.apply(msg);
        }
    }

    /// Publish a command, logging any failure.
    pub fn publish(&mut self, cmd: &comms_if::flight_cmd::FlightCmd) {
        if let Err(e) = self.link.publish(cmd) {
            warn!("Could not publish {:?}: {}", cmd.cmd_type(), e);
        }
    }
}

impl From<&GpioParams> for MotorOutputs {
    fn from(p: &GpioParams) -> Self {
        Self {
            grab: p.grab_output.clone(),
            release: p.release_output.clone(),
        }
    }
}
