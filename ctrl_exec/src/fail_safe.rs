//! # Fail-safe recoveries
//!
//! Maps the name given to a `FAIL_SAFE` block onto the recovery run when the block fails.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use util::script::ScriptKind;

use crate::{
    controller::Controller,
    interp::{self, InterpError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const HEIGHT_FIX_SCRIPT: &str = "height_fix";
const LANDING_SCRIPT: &str = "callback/landing.auto";
const STAY_SCRIPT: &str = "stay";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Run the height correction sequence
    HeightFix,

    /// Run the landing script
    Landing,

    /// Allow the mission to go back on patrol when the car is lost
    ReturnToBase,

    /// Hold position, used for every unregistered name
    Stay,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Recovery {
    /// Get the recovery registered under a name, case insensitive.
    pub fn from_name(name: &str) -> Self {
        match name.to_uppercase().as_str() {
            "HEIGHT_FIX" => Recovery::HeightFix,
            "LANDING" => Recovery::Landing,
            "DATE_BACK" | "RETURN_TO_BASE" => Recovery::ReturnToBase,
            _ => Recovery::Stay,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the recovery registered under a name.
pub fn recover(ctl: &mut Controller, name: &str) -> Result<(), InterpError> {
    match Recovery::from_name(name) {
        Recovery::HeightFix => {
            warn!("[FAIL_SAFE] Height Fix");
            interp::call_proxy(ctl, ScriptKind::Basic, HEIGHT_FIX_SCRIPT)?;
        }
        Recovery::Landing => {
            warn!("[FAIL_SAFE] Landing");
            interp::call_proxy(ctl, ScriptKind::Layered, LANDING_SCRIPT)?;
        }
        Recovery::ReturnToBase => {
            warn!("[FAIL_SAFE] Return to base enabled");
            ctl.ds.return_to_base = true;
        }
        Recovery::Stay => {
            warn!("[FAIL_SAFE] Stay ({})", name);
            interp::call_proxy(ctl, ScriptKind::Basic, STAY_SCRIPT)?;
        }
    }

    Ok(())
}
