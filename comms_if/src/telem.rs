//! # Telemetry module
//!
//! Messages published by the platform and the perception nodes, received by the controller node.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TelemMsg {
    /// Status code of the flight controller
    Status(FlightStatus),

    /// A target has been seen by a perception node.
    Pose {
        target: Target,

        /// Position of the target relative to the drone, in meters
        pose_m: [f32; 3],
    },
}

/// Status of the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    /// The flight controller is able to accept a new movement
    Ready,

    /// A takeoff (or other blocking movement) is in progress
    Busy,
}

/// Targets tracked by the perception nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// The landing circle
    Circle,

    /// The car carrying the drop zone
    Car,

    /// The guide tape on the ground
    Tape,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FlightStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, FlightStatus::Ready)
    }
}

impl Default for FlightStatus {
    fn default() -> Self {
        FlightStatus::Ready
    }
}
