//! # Controller Parameters
//!
//! This module provides the parameters of the controller executable, and the flight parameter set
//! (the registers mirrored to the flight controller).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    flight_cmd::{FlightCmd, FlightCmdType},
    net::NetParams,
};
use nalgebra::Vector3;
use serde::Deserialize;
use std::path::Path;
use util::params::LoadError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the controller executable, loaded from `ctrl_exec.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CtrlExecParams {
    /// Path to the flight parameter file, relative to the params directory
    pub flight_param_file: String,

    pub net: NetParams,

    pub scripts: ScriptParams,

    pub gpio: GpioParams,

    #[serde(default)]
    pub timing: TimingParams,

    #[serde(default)]
    pub interp: InterpParams,
}

/// Directories scripts are loaded from, relative to the software root.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptParams {
    /// Directory of the basic scripts (takeoff, height_fix, stay, ...)
    pub basic_dir: String,

    /// Directory of the layered scripts (`*.auto`)
    pub layered_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpioParams {
    /// Root of the sysfs GPIO tree
    #[serde(default = "default_gpio_root")]
    pub root: String,

    /// Output driving the grab motor
    pub grab_output: String,

    /// Output driving the release motor
    pub release_output: String,
}

/// Timings used by the blocking waits.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimingParams {
    /// Period between two message pumps while waiting for a fixed time
    pub pump_period_s: f64,

    /// Rate at which the ready status and the detection latches are polled
    pub poll_rate_hz: f64,

    /// Time given to the platform to start moving before its status is polled
    pub settle_s: f64,

    /// Time given to the perception nodes to report a target
    pub detect_grace_s: f64,

    /// Height added above a detected target
    pub detect_clearance_m: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct InterpParams {
    /// Maximum number of frames which can be stacked in the engine
    pub max_depth: usize,
}

/// The flight parameter registers.
///
/// Every register always holds a value: zero until loaded from the flight parameter file, then
/// only replaced by the commands which set it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSet {
    pub dest: Vector3<f32>,
    pub vel_limit: Vector3<f32>,
    pub err_limit: Vector3<f32>,
    pub pid_x_pos: Vector3<f32>,
    pub pid_x_vel: Vector3<f32>,
    pub pid_y_pos: Vector3<f32>,
    pub pid_y_vel: Vector3<f32>,
    pub pid_z: Vector3<f32>,
}

/// Layout of the flight parameter file.
#[derive(Debug, Deserialize)]
struct FlightParamFile {
    #[serde(rename = "DEST")]
    dest: [f32; 3],

    #[serde(rename = "VEL_LIM")]
    vel_limit: [f32; 3],

    #[serde(rename = "ERR_LIM")]
    err_limit: [f32; 3],

    /// Position gains then velocity gains
    #[serde(rename = "PID_X")]
    pid_x: [f32; 6],

    /// Position gains then velocity gains
    #[serde(rename = "PID_Y")]
    pid_y: [f32; 6],

    #[serde(rename = "PID_Z")]
    pid_z: [f32; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ParamSet {
    /// Load a complete set from a flight parameter file.
    ///
    /// The file is rejected as a whole if any key is missing or malformed.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file: FlightParamFile = util::params::load_file(path)?;
        Ok(file.into())
    }

    /// Update the register a command sets, if it sets one.
    ///
    /// Returns `true` if a register was changed.
    pub fn apply(&mut self, cmd: &FlightCmd) -> bool {
        let reg = match cmd.cmd_type() {
            FlightCmdType::SetDestinationAbsolute => &mut self.dest,
            FlightCmdType::SetVelocityLimit => &mut self.vel_limit,
            FlightCmdType::SetErrorLimit => &mut self.err_limit,
            FlightCmdType::SetPidXPosition => &mut self.pid_x_pos,
            FlightCmdType::SetPidXVelocity => &mut self.pid_x_vel,
            FlightCmdType::SetPidYPosition => &mut self.pid_y_pos,
            FlightCmdType::SetPidYVelocity => &mut self.pid_y_vel,
            FlightCmdType::SetPidZ => &mut self.pid_z,
            _ => return false,
        };

        *reg = cmd.data();
        true
    }
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            dest: Vector3::zeros(),
            vel_limit: Vector3::zeros(),
            err_limit: Vector3::zeros(),
            pid_x_pos: Vector3::zeros(),
            pid_x_vel: Vector3::zeros(),
            pid_y_pos: Vector3::zeros(),
            pid_y_vel: Vector3::zeros(),
            pid_z: Vector3::zeros(),
        }
    }
}

impl From<FlightParamFile> for ParamSet {
    fn from(f: FlightParamFile) -> Self {
        let v = |a: &[f32]| Vector3::new(a[0], a[1], a[2]);

        Self {
            dest: v(&f.dest),
            vel_limit: v(&f.vel_limit),
            err_limit: v(&f.err_limit),
            pid_x_pos: v(&f.pid_x[0..3]),
            pid_x_vel: v(&f.pid_x[3..6]),
            pid_y_pos: v(&f.pid_y[0..3]),
            pid_y_vel: v(&f.pid_y[3..6]),
            pid_z: v(&f.pid_z),
        }
    }
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            pump_period_s: 0.05,
            poll_rate_hz: 2.0,
            settle_s: 1.0,
            detect_grace_s: 0.3,
            detect_clearance_m: 0.5,
        }
    }
}

impl TimingParams {
    /// Period of one poll of the ready status or the detection latches.
    pub fn poll_period_s(&self) -> f64 {
        1.0 / self.poll_rate_hz
    }
}

impl Default for InterpParams {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

fn default_gpio_root() -> String {
    "/sys/class/gpio".into()
}
