//! # Command dispatcher
//!
//! Resolves one token of the command language, with the arguments which follow it, into a flight
//! command to publish, a directive for the engine, or an immediate effect.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    flight_cmd::{FlightCmd, FlightCmdType},
    telem::Target,
};
use conquer_once::Lazy;
use log::{debug, info, warn};
use nalgebra::Vector3;
use std::collections::HashMap;
use util::script::Cursor;

use crate::{
    console::{self, HELP},
    controller::Controller,
    gpio,
    sync::{self, LatchSelect},
};

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Every command of the language, keyed by its upper case name.
static COMMANDS: Lazy<HashMap<&'static str, Cmd>> = Lazy::new(|| {
    use FlightCmdType::*;

    let mut m = HashMap::new();

    m.insert("TAKEOFF", Cmd::Flight(TakeOff));
    for name in &["L", "LAND", "LANDING"] {
        m.insert(*name, Cmd::Flight(Land));
    }

    for name in &["D", "DEST"] {
        m.insert(*name, Cmd::FlightArgs(SetDestination));
    }
    m.insert("INC", Cmd::FlightArgs(SetDestinationIncremental));
    m.insert("STATIC", Cmd::FlightArgs(SetDestinationAbsolute));
    m.insert("XP", Cmd::FlightArgs(SetPidXPosition));
    m.insert("YP", Cmd::FlightArgs(SetPidYPosition));
    m.insert("XV", Cmd::FlightArgs(SetPidXVelocity));
    m.insert("YV", Cmd::FlightArgs(SetPidYVelocity));
    m.insert("PZ", Cmd::FlightArgs(SetPidZ));
    m.insert("VEL", Cmd::FlightArgs(SetVelocityLimit));
    m.insert("ERR", Cmd::FlightArgs(SetErrorLimit));

    for name in &["C", "C_DETECT"] {
        m.insert(*name, Cmd::Detect(Target::Circle));
    }
    for name in &["T", "T_DETECT"] {
        m.insert(*name, Cmd::Detect(Target::Car));
    }
    m.insert("TAPE_DETECT", Cmd::Ignored);

    m.insert("MG", Cmd::Motor(Motor::Grab));
    m.insert("MR", Cmd::Motor(Motor::Release));

    for name in &["WAIT", "WAIT_NONE"] {
        m.insert(*name, Cmd::Wait);
    }
    m.insert("WAIT_TIME", Cmd::WaitTime);
    m.insert("WAIT_FLAG", Cmd::WaitFlag);

    m.insert("STATE", Cmd::State);
    m.insert("FAIL_SAFE", Cmd::FailSafe);
    for name in &["SC", "SCRIPT"] {
        m.insert(*name, Cmd::Script);
    }

    for name in &["P", "PRINT", "DISPLAY"] {
        m.insert(*name, Cmd::Print);
    }
    for name in &["CLEAR", "CLS"] {
        m.insert(*name, Cmd::Clear);
    }
    m.insert("RF", Cmd::ReloadParams);
    for name in &["Q", "EXIT"] {
        m.insert(*name, Cmd::Quit);
    }

    m
});

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The result of dispatching one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Arguments were read, publish the command
    PublishWithArgs(FlightCmd),

    /// Publish the command, nothing was read
    PublishNoArgs(FlightCmd),

    /// Arguments were read, nothing to publish
    ConsumeArgsNoPublish,

    /// Nothing to do
    NoOp,

    /// The engine has to handle this command
    Directive(Directive),
}

/// Commands which change the flow of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Run the mission state machine from the given phase code
    StateMachine(i64),

    /// A recovery name and an indented block follow
    FailSafeBlock,

    /// A layered script name follows
    ScriptInclude,

    /// Leave the program
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmd {
    /// Flight command without arguments
    Flight(FlightCmdType),

    /// Flight command taking an x, y, z triple
    FlightArgs(FlightCmdType),

    /// Fly above a detected target
    Detect(Target),

    Motor(Motor),
    Wait,
    WaitTime,
    WaitFlag,
    State,
    FailSafe,
    Script,
    Print,
    Clear,
    ReloadParams,
    Quit,

    /// Recognised but has no effect
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motor {
    Grab,
    Release,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Dispatch a single token, reading its arguments from the cursor.
///
/// Tokens are case insensitive. Commands setting a flight parameter update the parameter store
/// before returning.
pub fn dispatch(ctl: &mut Controller, token: &str, cursor: &mut Cursor) -> Dispatch {
    let token = token.to_uppercase();

    let cmd = match COMMANDS.get(token.as_str()) {
        Some(c) => *c,
        None => {
            ctl.console.show(&format!("[{}] Undeclared Commands.\n", token));
            return Dispatch::NoOp;
        }
    };

    debug!("Dispatching {} as {:?}", token, cmd);

    match cmd {
        Cmd::Flight(t) => Dispatch::PublishNoArgs(FlightCmd::without_args(t)),
        Cmd::FlightArgs(t) => {
            let cmd = FlightCmd::new(t, read_triple(cursor));
            ctl.ds.params.apply(&cmd);
            Dispatch::PublishWithArgs(cmd)
        }
        Cmd::Detect(target) => detect(ctl, target),
        Cmd::Motor(m) => {
            let (output, msg) = match m {
                Motor::Grab => (ctl.outputs.grab.clone(), "Grab Motor Called. Next: "),
                Motor::Release => (ctl.outputs.release.clone(), "Release Motor Called. Next: "),
            };
            gpio::pulse(ctl.actuator.as_mut(), &output);
            ctl.console.show(msg);
            Dispatch::ConsumeArgsNoPublish
        }
        Cmd::Wait => {
            sync::wait_ready(ctl);
            Dispatch::NoOp
        }
        Cmd::WaitTime => {
            let secs = cursor.next_f32().unwrap_or(0.0);
            ctl.console.show(&format!("Wait for time: {}", secs));
            sync::wait_duration(ctl, secs as f64);
            Dispatch::ConsumeArgsNoPublish
        }
        Cmd::WaitFlag => {
            let select = match cursor.next_value::<i64>().unwrap_or(0) {
                1 => Some(LatchSelect::One(Target::Circle)),
                2 => Some(LatchSelect::One(Target::Car)),
                3 => Some(LatchSelect::Either(Target::Circle, Target::Car)),
                _ => None,
            };
            match select {
                Some(s) => sync::wait_latches(ctl, s),
                None => sync::wait_ready(ctl),
            };
            Dispatch::ConsumeArgsNoPublish
        }
        Cmd::State => Dispatch::Directive(Directive::StateMachine(
            cursor.next_value::<i64>().unwrap_or(0),
        )),
        Cmd::FailSafe => Dispatch::Directive(Directive::FailSafeBlock),
        Cmd::Script => Dispatch::Directive(Directive::ScriptInclude),
        Cmd::Print => {
            ctl.console.clear();
            ctl.console.show(&console::param_block(&ctl.ds.params));
            ctl.console.show(HELP);
            Dispatch::NoOp
        }
        Cmd::Clear => {
            ctl.console.clear();
            ctl.console.show(HELP);
            Dispatch::NoOp
        }
        Cmd::ReloadParams => {
            if ctl.ds.reload_params() {
                ctl.console.show(&console::param_block(&ctl.ds.params));
            }
            Dispatch::NoOp
        }
        Cmd::Quit => Dispatch::Directive(Directive::Quit),
        Cmd::Ignored => Dispatch::NoOp,
    }
}

/// Read an x, y, z triple, missing values are zero.
fn read_triple(cursor: &mut Cursor) -> Vector3<f32> {
    let mut v = Vector3::zeros();

    for i in 0..3 {
        match cursor.next_f32() {
            Some(x) => v[i] = x,
            None => {
                warn!("Expected 3 arguments, found {}, the rest are set to 0", i);
                break;
            }
        }
    }

    v
}

/// Give the perception nodes a short time to see the target, then fly above it.
///
/// If the target wasn't seen the interrupt is raised.
fn detect(ctl: &mut Controller, target: Target) -> Dispatch {
    ctl.ds.detections.latch_mut(target).clear();

    let grace_s = ctl.ds.timing.detect_grace_s;
    sync::wait_duration(ctl, grace_s);

    match ctl.ds.detections.latch_mut(target).take() {
        Some(pose) => {
            let clearance = Vector3::new(0.0, 0.0, ctl.ds.timing.detect_clearance_m);
            info!("{:?} detected at {:?}", target, pose);
            Dispatch::PublishWithArgs(FlightCmd::new(
                FlightCmdType::SetDestinationIncremental,
                pose + clearance,
            ))
        }
        None => {
            warn!("{:?} not detected", target);
            ctl.ds.signals.raise_interrupt();
            Dispatch::NoOp
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gpio::Level;
    use crate::sim::{Sim, Step};
    use comms_if::telem::TelemMsg;

    fn run(ctl: &mut Controller, text: &str) -> Dispatch {
        let mut cursor = Cursor::from_text(text);
        let token = cursor.next_token().unwrap();
        dispatch(ctl, &token, &mut cursor)
    }

    #[test]
    fn test_set_commands_update_registers() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        let cases: Vec<(&str, FlightCmdType)> = vec![
            ("xp", FlightCmdType::SetPidXPosition),
            ("YP", FlightCmdType::SetPidYPosition),
            ("XV", FlightCmdType::SetPidXVelocity),
            ("YV", FlightCmdType::SetPidYVelocity),
            ("PZ", FlightCmdType::SetPidZ),
            ("VEL", FlightCmdType::SetVelocityLimit),
            ("Err", FlightCmdType::SetErrorLimit),
            ("STATIC", FlightCmdType::SetDestinationAbsolute),
        ];

        for (i, (tok, t)) in cases.into_iter().enumerate() {
            let v = Vector3::new(i as f32, 0.5, -1.25);
            let d = run(&mut ctl, &format!("{} {} {} {}", tok, v.x, v.y, v.z));

            assert_eq!(d, Dispatch::PublishWithArgs(FlightCmd::new(t, v)));

            let p = &ctl.ds.params;
            let reg = match t {
                FlightCmdType::SetPidXPosition => p.pid_x_pos,
                FlightCmdType::SetPidYPosition => p.pid_y_pos,
                FlightCmdType::SetPidXVelocity => p.pid_x_vel,
                FlightCmdType::SetPidYVelocity => p.pid_y_vel,
                FlightCmdType::SetPidZ => p.pid_z,
                FlightCmdType::SetVelocityLimit => p.vel_limit,
                FlightCmdType::SetErrorLimit => p.err_limit,
                _ => p.dest,
            };
            assert_eq!(reg, v, "register of {}", tok);
        }
    }

    #[test]
    fn test_relative_destinations_not_stored() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        run(&mut ctl, "D 1 2 3");
        run(&mut ctl, "INC 1 2 3");
        assert_eq!(ctl.ds.params.dest, Vector3::zeros());
    }

    #[test]
    fn test_missing_args_are_zero() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        let mut cursor = Cursor::from_text("XP 1.5\nLAND");
        let token = cursor.next_token().unwrap();
        let d = dispatch(&mut ctl, &token, &mut cursor);

        assert_eq!(
            d,
            Dispatch::PublishWithArgs(FlightCmd::new(
                FlightCmdType::SetPidXPosition,
                Vector3::new(1.5, 0.0, 0.0)
            ))
        );
        assert_eq!(cursor.next_token().as_deref(), Some("LAND"));
    }

    #[test]
    fn test_no_arg_commands() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert_eq!(
            run(&mut ctl, "takeoff"),
            Dispatch::PublishNoArgs(FlightCmd::without_args(FlightCmdType::TakeOff))
        );
        assert_eq!(
            run(&mut ctl, "LANDING"),
            Dispatch::PublishNoArgs(FlightCmd::without_args(FlightCmdType::Land))
        );
        assert_eq!(run(&mut ctl, "TAPE_DETECT"), Dispatch::NoOp);
    }

    #[test]
    fn test_unknown_command() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert_eq!(run(&mut ctl, "hover"), Dispatch::NoOp);
        assert!(sim.output().contains("[HOVER] Undeclared Commands."));
        assert!(sim.published().is_empty());
    }

    #[test]
    fn test_detect_without_target() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert_eq!(run(&mut ctl, "C_DETECT"), Dispatch::NoOp);
        assert!(ctl.ds.signals.interrupt_raised());
        assert!((sim.elapsed_s() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_detect_stale_latch_ignored() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        // Seen before the command, must be seen again during the grace period
        ctl.ds.detections.circle.set(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(run(&mut ctl, "C"), Dispatch::NoOp);
    }

    #[test]
    fn test_detect_with_target() {
        let sim = Sim::new();
        sim.schedule(
            3,
            Step::Telem(TelemMsg::Pose {
                target: Target::Car,
                pose_m: [1.0, -2.0, 0.25],
            }),
        );
        let mut ctl = sim.controller();

        assert_eq!(
            run(&mut ctl, "t"),
            Dispatch::PublishWithArgs(FlightCmd::new(
                FlightCmdType::SetDestinationIncremental,
                Vector3::new(1.0, -2.0, 0.75)
            ))
        );
        assert!(!ctl.ds.detections.car.detected);
        assert!(!ctl.ds.signals.interrupt_raised());
    }

    #[test]
    fn test_motors() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert_eq!(run(&mut ctl, "MG"), Dispatch::ConsumeArgsNoPublish);
        assert_eq!(run(&mut ctl, "mr"), Dispatch::ConsumeArgsNoPublish);

        assert_eq!(
            sim.outputs(),
            vec![
                ("gpio157".to_string(), Level::Low),
                ("gpio157".to_string(), Level::High),
                ("gpio157".to_string(), Level::Low),
                ("gpio158".to_string(), Level::Low),
                ("gpio158".to_string(), Level::High),
                ("gpio158".to_string(), Level::Low),
            ]
        );
        assert!(sim.output().contains("Grab Motor Called. Next: "));
        assert!(sim.output().contains("Release Motor Called. Next: "));
    }

    #[test]
    fn test_waits() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert_eq!(run(&mut ctl, "WAIT_TIME 2"), Dispatch::ConsumeArgsNoPublish);
        assert!(sim.output().contains("Wait for time: 2"));
        assert!((sim.elapsed_s() - 2.0).abs() < 1e-6);

        // Already ready, only the settle time passes
        assert_eq!(run(&mut ctl, "WAIT"), Dispatch::NoOp);
        assert!((sim.elapsed_s() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_directives() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert_eq!(
            run(&mut ctl, "STATE 5"),
            Dispatch::Directive(Directive::StateMachine(5))
        );
        assert_eq!(
            run(&mut ctl, "STATE"),
            Dispatch::Directive(Directive::StateMachine(0))
        );
        assert_eq!(
            run(&mut ctl, "fail_safe stay"),
            Dispatch::Directive(Directive::FailSafeBlock)
        );
        assert_eq!(
            run(&mut ctl, "SC patrol.auto"),
            Dispatch::Directive(Directive::ScriptInclude)
        );
        assert_eq!(run(&mut ctl, "exit"), Dispatch::Directive(Directive::Quit));
    }

    #[test]
    fn test_print_shows_registers() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        run(&mut ctl, "XP 1 2 3");
        assert_eq!(run(&mut ctl, "PRINT"), Dispatch::NoOp);

        assert_eq!(sim.clears(), 1);
        assert!(sim.output().contains(" PID set for X POS:\t{ 1\t2\t3 }"));
        assert!(sim.output().contains("Please Select One:"));
    }
}
