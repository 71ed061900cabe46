//! # Flight command module
//!
//! This module provides the flight commands which the controller node publishes to the flight
//! controller. A command is a type plus a three component payload, and is never modified after it
//! has been built.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A flight command, i.e. an instruction sent to the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightCmd {
    /// The type of the command
    cmd_type: FlightCmdType,

    /// The payload associated with this command. Commands without arguments carry a zero vector.
    data: Vector3<f32>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Flight command types.
///
/// The discriminant of each type is the code used by the flight controller to identify the
/// command on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum FlightCmdType {
    SetDestination = 0x01,
    SetVelocityLimit = 0x02,
    SetErrorLimit = 0x03,
    SetPidXPosition = 0x04,
    SetPidYPosition = 0x05,
    SetPidZ = 0x06,
    SetPidXVelocity = 0x07,
    SetPidYVelocity = 0x08,
    Land = 0x09,
    TakeOff = 0x0A,
    SetDestinationIncremental = 0x0B,
    SetDestinationAbsolute = 0x0C,
}

/// Possible decoding errors.
#[derive(Debug, Error)]
pub enum FlightCmdParseError {
    #[error("Command contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("0x{0:02X} is not a recognised flight command code")]
    InvalidCode(u8),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FlightCmd {
    /// Build a new command with the given payload.
    pub fn new(cmd_type: FlightCmdType, data: Vector3<f32>) -> Self {
        Self { cmd_type, data }
    }

    /// Build a command which carries no arguments, the payload is zeroed.
    pub fn without_args(cmd_type: FlightCmdType) -> Self {
        Self::new(cmd_type, Vector3::zeros())
    }

    pub fn cmd_type(&self) -> FlightCmdType {
        self.cmd_type
    }

    pub fn data(&self) -> Vector3<f32> {
        self.data
    }

    /// Serialise the command into the JSON packet sent over the network.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a command from a JSON packet.
    pub fn from_json(json_str: &str) -> Result<Self, FlightCmdParseError> {
        serde_json::from_str(json_str).map_err(FlightCmdParseError::InvalidJson)
    }
}

impl FlightCmdType {
    /// The one byte wire code of this type.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Get the type associated with a wire code.
    pub fn from_code(code: u8) -> Result<Self, FlightCmdParseError> {
        use FlightCmdType::*;

        match code {
            0x01 => Ok(SetDestination),
            0x02 => Ok(SetVelocityLimit),
            0x03 => Ok(SetErrorLimit),
            0x04 => Ok(SetPidXPosition),
            0x05 => Ok(SetPidYPosition),
            0x06 => Ok(SetPidZ),
            0x07 => Ok(SetPidXVelocity),
            0x08 => Ok(SetPidYVelocity),
            0x09 => Ok(Land),
            0x0A => Ok(TakeOff),
            0x0B => Ok(SetDestinationIncremental),
            0x0C => Ok(SetDestinationAbsolute),
            c => Err(FlightCmdParseError::InvalidCode(c)),
        }
    }
}
