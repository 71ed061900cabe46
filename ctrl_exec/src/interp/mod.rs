//! # Script interpretation engine
//!
//! The engine reads tokens from a frame's source and hands them to the dispatcher. Included
//! scripts and fail-safe blocks are run as child frames on an explicit stack: the parent is
//! suspended until its child exits, then receives the child's result.
//!
//! A frame exits when its source is exhausted (success) or when it observes a raised interrupt,
//! which it consumes (failure). Only the innermost running frame therefore sees a given interrupt.
//! A guarded block which fails runs its recovery and makes the enclosing frame fail too, so the
//! failure climbs through nested guarded blocks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod frame;

pub use frame::{fail_layer, Frame, FrameExit, FrameMode, FrameReport, FAIL_SAFE_LAYER, PROXY_LAYER};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, warn};
use thiserror::Error;
use util::script::ScriptKind;

use crate::{
    console,
    controller::Controller,
    dispatch::{dispatch, Directive, Dispatch},
    fail_safe, mission, sync,
};
use frame::Pending;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which end interpretation altogether.
#[derive(Debug, Error)]
pub enum InterpError {
    #[error("The operator quit")]
    Quit,
}

impl InterpError {
    /// Code the process exits with when interpretation ends with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpError::Quit => 1,
        }
    }
}

/// What to do after one step of the top frame.
enum Step {
    Continue,
    Push(Frame),
    Exit(FrameExit),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run a frame and every child it starts until it exits.
///
/// Returns whether the frame finished successfully. Only an operator quit is returned as an error.
pub fn run(ctl: &mut Controller, root: Frame) -> Result<bool, InterpError> {
    let mut stack: Vec<Frame> = Vec::new();

    if !enter(ctl, &mut stack, root) {
        return Ok(false);
    }

    let mut child_ok: Option<bool> = None;

    loop {
        let next = match stack.last_mut() {
            Some(top) => step(ctl, top, child_ok.take()),
            None => return Ok(true),
        };

        match next {
            Ok(Step::Continue) => (),
            Ok(Step::Push(child)) => {
                if !enter(ctl, &mut stack, child) {
                    child_ok = Some(false);
                }
            }
            Ok(Step::Exit(exit)) => {
                let ok = exit.is_success();
                leave(ctl, &mut stack, exit);

                if stack.is_empty() {
                    return Ok(ok);
                }
                child_ok = Some(ok);
            }
            Err(e) => {
                ctl.depth -= stack.len();
                return Err(e);
            }
        }
    }
}

/// Run a named script as its own frame at the proxy layer.
///
/// A script which can't be loaded runs as an empty script.
pub fn call_proxy(ctl: &mut Controller, kind: ScriptKind, name: &str) -> Result<bool, InterpError> {
    let text = load_script(ctl, kind, name);
    run(ctl, Frame::script(PROXY_LAYER, &text))
}

/// Push a frame if the depth limit allows it.
fn enter(ctl: &mut Controller, stack: &mut Vec<Frame>, frame: Frame) -> bool {
    if ctl.depth >= ctl.max_depth {
        error!(
            "Cannot start a frame at layer {}, {} frames are already running",
            frame.layer, ctl.depth
        );
        return false;
    }

    debug!("Entering {:?} frame at layer {}", frame.mode, frame.layer);
    ctl.depth += 1;
    stack.push(frame);
    true
}

/// Pop the top frame and report how it ended.
fn leave(ctl: &mut Controller, stack: &mut Vec<Frame>, exit: FrameExit) {
    let frame = match stack.pop() {
        Some(f) => f,
        None => return,
    };
    ctl.depth -= 1;

    let report = FrameReport {
        layer: frame.layer,
        line: frame.cursor.line_num(),
        exit,
    };
    info!("{:?} frame ended: {:?}", frame.mode, report);
    ctl.console.show(&console::frame_report(&report));
}

/// Execute one command of the frame.
fn step(ctl: &mut Controller, frame: &mut Frame, child_ok: Option<bool>) -> Result<Step, InterpError> {
    // Result of the child we were waiting on
    if let Some(ok) = child_ok {
        if let Some(Pending::FailSafe(recovery)) = frame.pending.take() {
            if !ok {
                fail_safe::recover(ctl, &recovery)?;
                return Ok(Step::Exit(FrameExit::Chained(recovery)));
            }
        }
    }

    if ctl.ds.signals.interrupt_raised() {
        return Ok(Step::Exit(end_of_frame(ctl)));
    }

    ctl.pump();

    let token = match frame.cursor.next_token() {
        Some(t) => t,
        None => return Ok(Step::Exit(end_of_frame(ctl))),
    };

    match dispatch(ctl, &token, &mut frame.cursor) {
        Dispatch::PublishWithArgs(cmd) | Dispatch::PublishNoArgs(cmd) => {
            ctl.publish(&cmd);
            ctl.console
                .show(&console::echo(frame.layer, frame.style, &token, &cmd));
        }
        Dispatch::ConsumeArgsNoPublish | Dispatch::NoOp => (),
        Dispatch::Directive(Directive::StateMachine(code)) => mission::run(ctl, code)?,
        Dispatch::Directive(Directive::Quit) => return Err(InterpError::Quit),
        Dispatch::Directive(Directive::ScriptInclude) => {
            let name = frame.cursor.next_token().unwrap_or_default();

            sync::wait_ready(ctl);
            let text = load_script(ctl, ScriptKind::Layered, &name);

            frame.pending = Some(Pending::Include);
            return Ok(Step::Push(Frame::script(frame.layer + 1, &text)));
        }
        Dispatch::Directive(Directive::FailSafeBlock) => {
            let recovery = frame.cursor.next_token().unwrap_or_default();
            ctl.console.show(&recovery);

            // The block is the rest of this line plus every following indented line
            let mut body = Vec::new();
            let rest = frame.cursor.rest_of_line();
            if !rest.trim().is_empty() {
                body.push(rest);
            }
            while let Some(line) = frame.cursor.next_line_if_indented() {
                body.push(line);
            }

            frame.pending = Some(Pending::FailSafe(recovery));
            return Ok(Step::Push(Frame::fail_safe(
                fail_layer(frame.layer),
                &body.join("\n"),
            )));
        }
    }

    Ok(Step::Continue)
}

/// How a frame which stops reading ends, consuming the interrupt if one was raised.
fn end_of_frame(ctl: &mut Controller) -> FrameExit {
    if ctl.ds.signals.take_interrupt() {
        FrameExit::Interrupted
    } else {
        FrameExit::Finished
    }
}

fn load_script(ctl: &mut Controller, kind: ScriptKind, name: &str) -> String {
    match ctl.scripts.load(kind, name) {
        Ok(t) => t,
        Err(e) => {
            warn!("Could not open {:?} script \"{}\", running it as empty: {}", kind, name, e);
            String::new()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::EchoStyle;
    use crate::sim::{Sim, Step as SimStep};
    use comms_if::flight_cmd::{FlightCmd, FlightCmdType};
    use nalgebra::Vector3;
    use util::script::Cursor;

    fn top(text: &str) -> Frame {
        Frame::new(0, FrameMode::Script, EchoStyle::Compact, Cursor::from_text(text))
    }

    #[test]
    fn test_publish_and_echo() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert!(run(&mut ctl, top("TAKEOFF\nxp 1 2 3\nhover")).unwrap());

        assert_eq!(
            sim.published(),
            vec![
                FlightCmd::without_args(FlightCmdType::TakeOff),
                FlightCmd::new(FlightCmdType::SetPidXPosition, Vector3::new(1.0, 2.0, 3.0)),
            ]
        );
        assert_eq!(
            sim.shown(),
            vec![
                "[ECHO_0] TAKEOFF (0,\t0,\t0 )".to_string(),
                "[ECHO_0] xp (1,\t2,\t3 )".to_string(),
                "[HOVER] Undeclared Commands.\n".to_string(),
                "[ECHO_0] FINISHED.\n".to_string(),
            ]
        );
        assert_eq!(ctl.depth, 0);
    }

    #[test]
    fn test_nested_script_layers() {
        let sim = Sim::new()
            .with_script(ScriptKind::Layered, "a.auto", "SC b.auto\nLAND")
            .with_script(ScriptKind::Layered, "b.auto", "SILENT\nTAKEOFF");
        let mut ctl = sim.controller();

        assert!(run(&mut ctl, top("SC a.auto")).unwrap());

        assert_eq!(
            sim.shown(),
            vec![
                "[ECHO_2] TAKEOFF (0,\t0,\t0 )".to_string(),
                "[ECHO_2] FINISHED.\n".to_string(),
                "[ECHO_1] LAND (0,\t0,\t0 )".to_string(),
                "[ECHO_1] FINISHED.\n".to_string(),
                "[ECHO_0] FINISHED.\n".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_script_is_empty() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert!(run(&mut ctl, top("SC nowhere.auto\nLAND")).unwrap());
        assert!(sim.output().contains("[ECHO_1] FINISHED."));
        assert_eq!(sim.published().len(), 1);
    }

    #[test]
    fn test_fail_safe_success_continues() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        assert!(run(&mut ctl, top("FAIL_SAFE height_fix TAKEOFF\n\tINC 0 0 1\nLAND")).unwrap());

        assert_eq!(
            sim.shown(),
            vec![
                "height_fix".to_string(),
                "[ECHO_1001] TAKEOFF (0,\t0,\t0 )".to_string(),
                "[ECHO_1001] INC (0,\t0,\t1 )".to_string(),
                "[ECHO_1001] FINISHED.\n".to_string(),
                "[ECHO_0] LAND (0,\t0,\t0 )".to_string(),
                "[ECHO_0] FINISHED.\n".to_string(),
            ]
        );
    }

    #[test]
    fn test_fail_safe_failure_runs_recovery_and_chains() {
        let sim = Sim::new().with_script(ScriptKind::Basic, "height_fix", "INC 0 0 0.5");
        let mut ctl = sim.controller();

        // C finds nothing and raises the interrupt, failing the block
        let ok = run(&mut ctl, top("FAIL_SAFE height_fix\n\tC\n\tTAKEOFF\nLAND")).unwrap();

        // Both effects: the recovery ran and the enclosing frame failed
        assert!(!ok);
        assert_eq!(
            sim.published(),
            vec![FlightCmd::new(
                FlightCmdType::SetDestinationIncremental,
                Vector3::new(0.0, 0.0, 0.5)
            )]
        );

        let out = sim.output();
        assert!(out.contains("[ECHO_1001, 1] INTERRUPTED."));
        assert!(out.contains("[ECHO_2000] INC (0,\t0,\t0.5 )"));
        assert!(out.contains("[ECHO_2000] FINISHED."));
        assert!(out.contains("[ECHO_0, 3] INTERRUPTED (height_fix)."));
        assert!(!ctl.ds.signals.interrupt_raised());
    }

    #[test]
    fn test_nested_fail_safe_chain() {
        let sim = Sim::new()
            .with_script(ScriptKind::Basic, "height_fix", "INC 0 0 0.5")
            .with_script(ScriptKind::Basic, "stay", "INC 0 0 0");
        let mut ctl = sim.controller();

        let ok = run(
            &mut ctl,
            top("FAIL_SAFE stay\n\tFAIL_SAFE height_fix\n\t\tT\nTAKEOFF"),
        )
        .unwrap();

        assert!(!ok);

        // Inner recovery first, then the outer one, and nothing after the block
        let types: Vec<Vector3<f32>> = sim.published().iter().map(|c| c.data()).collect();
        assert_eq!(
            types,
            vec![Vector3::new(0.0, 0.0, 0.5), Vector3::new(0.0, 0.0, 0.0)]
        );

        let out = sim.output();
        assert!(out.contains("[ECHO_1002, 1] INTERRUPTED."));
        assert!(out.contains("INTERRUPTED (height_fix)."));
        assert!(out.contains("INTERRUPTED (stay)."));
        assert!(!out.contains("TAKEOFF"));
    }

    #[test]
    fn test_interrupt_absorbed_by_one_frame() {
        let sim = Sim::new().with_script(ScriptKind::Layered, "b.auto", "WAIT_TIME 5\nLAND");
        let mut ctl = sim.controller();

        // Raise during the wait of the first include, then again during the second
        sim.schedule(25, SimStep::Interrupt);
        sim.schedule(60, SimStep::Interrupt);

        let ok = run(&mut ctl, top("SC b.auto\nSC b.auto\nTAKEOFF")).unwrap();
        assert!(ok);
        assert!(!ctl.ds.signals.interrupt_raised());

        // Each raise failed exactly one frame, the parent carried on
        let out = sim.output();
        assert_eq!(out.matches("INTERRUPTED").count(), 2);
        assert_eq!(out.matches("[ECHO_1, 1] INTERRUPTED.").count(), 2);
        assert!(out.contains("[ECHO_0] TAKEOFF"));
        assert!(out.contains("[ECHO_0] FINISHED."));
        assert!(!out.contains("LAND"));
    }

    #[test]
    fn test_circle_detect_publishes_above_target() {
        use comms_if::telem::{TelemMsg, Target};

        let sim = Sim::new();
        let mut ctl = sim.controller();

        // Seen during the grace period
        sim.schedule(
            3,
            SimStep::Telem(TelemMsg::Pose {
                target: Target::Circle,
                pose_m: [0.5, -1.0, 1.25],
            }),
        );

        assert!(run(&mut ctl, top("C_DETECT")).unwrap());

        assert_eq!(
            sim.published(),
            vec![FlightCmd::new(
                FlightCmdType::SetDestinationIncremental,
                Vector3::new(0.5, -1.0, 1.75)
            )]
        );
        assert!(sim.output().contains("[ECHO_0] C_DETECT (0.5,\t-1,\t1.75 )"));
        assert!(!ctl.ds.signals.interrupt_raised());
    }

    #[test]
    fn test_quit() {
        let sim = Sim::new().with_script(ScriptKind::Layered, "q.auto", "Q\nLAND");
        let mut ctl = sim.controller();

        match run(&mut ctl, top("SC q.auto\nTAKEOFF")) {
            Err(InterpError::Quit) => (),
            other => panic!("Expected a quit, got {:?}", other),
        }
        assert!(sim.published().is_empty());
        assert_eq!(ctl.depth, 0);
        assert_ne!(InterpError::Quit.exit_code(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let sim = Sim::new().with_script(ScriptKind::Layered, "self.auto", "SC self.auto");
        let mut ctl = sim.controller();
        ctl.max_depth = 4;

        assert!(run(&mut ctl, top("SC self.auto")).unwrap());
        assert_eq!(sim.output().matches("FINISHED.").count(), 4);
        assert!(sim.output().contains("[ECHO_3] FINISHED."));
        assert_eq!(ctl.depth, 0);
    }
}
