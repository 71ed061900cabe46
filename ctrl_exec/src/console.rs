//! # Operator console
//!
//! Everything the operator sees goes through a [`Console`]. The text itself is built by the free
//! functions of this module so it can be checked without a terminal.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::flight_cmd::FlightCmd;
use nalgebra::Vector3;
use std::io::Write;

use crate::interp::{FrameExit, FrameReport};
use crate::params::ParamSet;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// ANSI sequence clearing the screen and moving the cursor home.
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

pub const HELP: &str = "\
            Remote Controller Helper
 ===============================================
   [TAKEOFF] Takeoff
   [L/LAND/LANDING] Landing
   [D/DEST] Destination Coordinate Set
   [INC] Incremental Destination Coordinate
   [STATIC] World Destination Coordinate Set
   [XP] PID set for x-axis position
   [XV] PID set for x-axis velocity
   [YP] PID set for y-axis position
   [YV] PID set for y-axis velocity
   [PZ] PID set for z-axis
   [VEL] Velocity limit set
   [ERR] Location error limit set
   [C/C_DETECT] Fly above the detected circle
   [T/T_DETECT] Fly above the detected car
   [STATE] Init State Machine
       Param: INIT=0, GRAB=1, DROP=2, PATROL=5
       Param: CIRCLE=3, CAR=4, MANUAL=6
   [WAIT] Wait for drone movement stop
   [WAIT_TIME] Wait for a number of seconds
   [WAIT_FLAG] Wait for a detection (1=circle, 2=car, 3=either)
   [SC/SCRIPT] Run a layered script
   [FAIL_SAFE] Guard the indented block with a recovery
   [MG] Grab Motor
   [MR] Release Motor
   [RF] Reset to File
   [P/PRINT] Print current parameters.
   [CLEAR/CLS] Clear Screen
   [Q/EXIT] Quit
Please Select One:";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Console {
    /// Show a block of text, followed by a new line.
    fn show(&mut self, text: &str);

    fn clear(&mut self);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Console on the process's standard output.
#[derive(Debug, Default)]
pub struct StdConsole;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How published commands are echoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStyle {
    /// One `[ECHO_n]` line per command, used by scripts
    Compact,

    /// Full packet followed by a new prompt, used at the prompt
    Verbose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Console for StdConsole {
    fn show(&mut self, text: &str) {
        println!("{}", text);
    }

    fn clear(&mut self) {
        print!("{}", CLEAR_SCREEN);
        std::io::stdout().flush().ok();
    }
}

impl EchoStyle {
    /// Style selected by a script header token, if the token is one.
    pub fn from_header(token: &str) -> Option<Self> {
        match token.to_uppercase().as_str() {
            "SILENT" => Some(EchoStyle::Compact),
            "VERBOSE" => Some(EchoStyle::Verbose),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Echo of a published command.
pub fn echo(layer: u32, style: EchoStyle, token: &str, cmd: &FlightCmd) -> String {
    let d = cmd.data();

    match style {
        EchoStyle::Compact => format!(
            "[ECHO_{}] {} ({},\t{},\t{} )",
            layer, token, d.x, d.y, d.z
        ),
        EchoStyle::Verbose => format!(
            "\n[({}), ({},{},{}) ] published.\n[Success!]Please Select Another One:",
            cmd.cmd_type().code(),
            d.x,
            d.y,
            d.z
        ),
    }
}

/// Final line of a frame.
pub fn frame_report(report: &FrameReport) -> String {
    match report.exit {
        FrameExit::Finished => format!("[ECHO_{}] FINISHED.\n", report.layer),
        FrameExit::Interrupted => {
            format!("[ECHO_{}, {}] INTERRUPTED.", report.layer, report.line)
        }
        FrameExit::Chained(ref recovery) => format!(
            "[ECHO_{}, {}] INTERRUPTED ({}).",
            report.layer, report.line, recovery
        ),
    }
}

/// The current flight parameters.
pub fn param_block(p: &ParamSet) -> String {
    let gains = |v: &Vector3<f32>| format!("{{ {}\t{}\t{} }}", v.x, v.y, v.z);

    format!(
        "\n               Current Parameter Set\n \
         ===============================================\n \
         Destination Point: ( {}, {}, {} )\n \
         PID set for X POS:\t{}\n \
         PID set for X VEL:\t{}\n \
         PID set for Y POS:\t{}\n \
         PID set for Y VEL:\t{}\n \
         PID set for Z:\t{}\n \
         Velocity limit:\t{}\n \
         Location Error limit:\t{}\n",
        p.dest.x,
        p.dest.y,
        p.dest.z,
        gains(&p.pid_x_pos),
        gains(&p.pid_x_vel),
        gains(&p.pid_y_pos),
        gains(&p.pid_y_vel),
        gains(&p.pid_z),
        gains(&p.vel_limit),
        gains(&p.err_limit),
    )
}
