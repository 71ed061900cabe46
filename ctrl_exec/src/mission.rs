//! # Mission state machine
//!
//! The mission is a fixed graph of phases. Each phase runs its scripts through the engine and the
//! next phase depends on whether they succeeded. The machine stops when it reaches the manual
//! phase, handing control back to the caller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use util::script::ScriptKind;

use crate::{
    controller::Controller,
    interp::{self, InterpError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct StateMachine {
    phase: MissionPhase,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionPhase {
    Init,
    Grab,
    Drop,
    CircleLand,
    BaseLand,
    Patrol,
    Manual,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MissionPhase {
    /// Phase selected by a `STATE` code. Unknown codes select manual.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => MissionPhase::Init,
            1 => MissionPhase::Grab,
            2 => MissionPhase::Drop,
            3 => MissionPhase::CircleLand,
            4 => MissionPhase::BaseLand,
            5 => MissionPhase::Patrol,
            _ => MissionPhase::Manual,
        }
    }

    fn header(&self) -> &'static str {
        match self {
            MissionPhase::Init => "<init>",
            MissionPhase::Grab => "<grab>",
            MissionPhase::Drop => "<drop>",
            MissionPhase::CircleLand => "<landing>",
            MissionPhase::BaseLand => "<base_land>",
            MissionPhase::Patrol => "<patrol>",
            MissionPhase::Manual => "<manual>",
        }
    }
}

impl StateMachine {
    pub fn new(phase: MissionPhase) -> Self {
        Self { phase }
    }

    /// Start a mission in the given phase.
    ///
    /// Only aborts raised after this point stop the mission.
    pub fn start(ctl: &mut Controller, phase: MissionPhase) -> Self {
        if ctl.ds.signals.abort_raised() {
            info!("Clearing an abort raised before the mission started");
        }
        ctl.ds.signals.rearm();

        Self::new(phase)
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    /// Run the current phase and move on to the next one.
    ///
    /// Returns `false` once the machine has stopped in manual. An operator abort forces manual.
    pub fn step(&mut self, ctl: &mut Controller) -> Result<bool, InterpError> {
        if ctl.ds.signals.abort_raised() && self.phase != MissionPhase::Manual {
            warn!("Mission aborted during {:?}", self.phase);
            self.phase = MissionPhase::Manual;
        }

        if self.phase == MissionPhase::Manual {
            ctl.console.show("\n{[(<State Machine Failed!>)]}\n");
            ctl.ds.signals.rearm();
            ctl.console.show("{[(<What's NEXT?>)]}");
            return Ok(false);
        }

        ctl.console.show(self.phase.header());
        let ok = run_phase(ctl, self.phase)?;
        let next = next_phase(self.phase, ok, ctl.ds.return_to_base);

        info!("Mission phase {:?} (ok: {}) -> {:?}", self.phase, ok, next);
        self.phase = next;

        Ok(true)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the mission from the phase with the given code until it stops.
pub fn run(ctl: &mut Controller, code: i64) -> Result<(), InterpError> {
    let mut sm = StateMachine::start(ctl, MissionPhase::from_code(code));
    info!("Mission started in {:?}", sm.phase());

    while sm.step(ctl)? {}

    Ok(())
}

/// The transition table.
pub fn next_phase(phase: MissionPhase, ok: bool, return_to_base: bool) -> MissionPhase {
    use MissionPhase::*;

    match phase {
        Init => Grab,
        Grab => Patrol,
        Drop => CircleLand,
        CircleLand if ok => Init,
        CircleLand => CircleLand,
        BaseLand if ok => Drop,
        BaseLand if return_to_base => Patrol,
        BaseLand => Manual,
        Patrol if ok => BaseLand,
        Patrol => Manual,
        Manual => Manual,
    }
}

/// Run the scripts of a phase, returning whether the phase succeeded.
fn run_phase(ctl: &mut Controller, phase: MissionPhase) -> Result<bool, InterpError> {
    let layered = |ctl: &mut Controller, name: &str| interp::call_proxy(ctl, ScriptKind::Layered, name);

    match phase {
        MissionPhase::Init => layered(ctl, "init_wait.auto"),
        MissionPhase::Grab => {
            layered(ctl, "grab.auto")?;
            interp::call_proxy(ctl, ScriptKind::Basic, "takeoff")
        }
        MissionPhase::Drop => layered(ctl, "drop.auto"),
        MissionPhase::CircleLand => layered(ctl, "landing.auto"),
        MissionPhase::BaseLand => layered(ctl, "car_detect.auto"),
        MissionPhase::Patrol => layered(ctl, "patrol.auto"),
        MissionPhase::Manual => Ok(false),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{Sim, Step};
    use MissionPhase::*;

    #[test]
    fn test_transition_table() {
        for &rtb in &[false, true] {
            for &ok in &[false, true] {
                assert_eq!(next_phase(Init, ok, rtb), Grab);
                assert_eq!(next_phase(Grab, ok, rtb), Patrol);
                assert_eq!(next_phase(Drop, ok, rtb), CircleLand);
                assert_eq!(next_phase(Manual, ok, rtb), Manual);
            }

            assert_eq!(next_phase(CircleLand, true, rtb), Init);
            assert_eq!(next_phase(CircleLand, false, rtb), CircleLand);
            assert_eq!(next_phase(BaseLand, true, rtb), Drop);
            assert_eq!(next_phase(Patrol, true, rtb), BaseLand);
            assert_eq!(next_phase(Patrol, false, rtb), Manual);
        }

        assert_eq!(next_phase(BaseLand, false, true), Patrol);
        assert_eq!(next_phase(BaseLand, false, false), Manual);
    }

    #[test]
    fn test_codes() {
        assert_eq!(MissionPhase::from_code(0), Init);
        assert_eq!(MissionPhase::from_code(4), BaseLand);
        assert_eq!(MissionPhase::from_code(5), Patrol);
        assert_eq!(MissionPhase::from_code(6), Manual);
        assert_eq!(MissionPhase::from_code(-1), Manual);
    }

    #[test]
    fn test_patrol_outcomes() {
        // Succeeding patrol goes to the base
        let sim = Sim::new().with_script(ScriptKind::Layered, "patrol.auto", "D 1 1 2");
        let mut ctl = sim.controller();
        let mut sm = StateMachine::new(Patrol);

        assert!(sm.step(&mut ctl).unwrap());
        assert_eq!(sm.phase(), BaseLand);

        // Losing the car fails the patrol
        let sim = Sim::new().with_script(ScriptKind::Layered, "patrol.auto", "T_DETECT");
        let mut ctl = sim.controller();
        let mut sm = StateMachine::new(Patrol);

        assert!(sm.step(&mut ctl).unwrap());
        assert_eq!(sm.phase(), Manual);
        assert!(!sm.step(&mut ctl).unwrap());
    }

    #[test]
    fn test_base_land_ignores_return_flag_on_success() {
        for &rtb in &[false, true] {
            let sim = Sim::new().with_script(ScriptKind::Layered, "car_detect.auto", "INC 0 0 -1");
            let mut ctl = sim.controller();
            ctl.ds.return_to_base = rtb;
            let mut sm = StateMachine::new(BaseLand);

            sm.step(&mut ctl).unwrap();
            assert_eq!(sm.phase(), Drop);
        }
    }

    #[test]
    fn test_run_until_manual() {
        let sim = Sim::new()
            .with_script(ScriptKind::Layered, "car_detect.auto", "T")
            .with_script(ScriptKind::Layered, "patrol.auto", "D 0 0 2");
        let mut ctl = sim.controller();
        ctl.ds.return_to_base = true;

        // Car lost once with return to base set goes back on patrol, then every phase after
        // that is forced into manual by the abort
        sim.schedule(30, Step::Abort);
        run(&mut ctl, 4).unwrap();

        let out = sim.output();
        assert!(out.contains("<base_land>"));
        assert!(out.contains("<patrol>"));
        assert!(out.contains("{[(<State Machine Failed!>)]}"));
        assert!(out.contains("{[(<What's NEXT?>)]}"));

        // The abort is cleared so the mission can be started again
        assert!(!ctl.ds.signals.abort_raised());
    }

    #[test]
    fn test_earlier_abort_does_not_stop_mission() {
        let sim = Sim::new()
            .with_script(ScriptKind::Layered, "w.auto", "WAIT_TIME 5\nLAND")
            .with_script(ScriptKind::Layered, "patrol.auto", "D 1 1 2");
        let mut ctl = sim.controller();

        // Abort during a plain script, absorbed by that script's frame
        sim.schedule(30, Step::Abort);
        let frame = crate::interp::Frame::script(0, "SC w.auto");
        assert!(crate::interp::run(&mut ctl, frame).unwrap());
        assert!(sim.output().contains("[ECHO_1, 1] INTERRUPTED."));
        assert!(ctl.ds.signals.abort_raised());

        let mut sm = StateMachine::start(&mut ctl, Patrol);
        assert!(!ctl.ds.signals.abort_raised());

        assert!(sm.step(&mut ctl).unwrap());
        assert_eq!(sm.phase(), BaseLand);
        assert!(!sim.output().contains("{[(<State Machine Failed!>)]}"));
    }

    #[test]
    fn test_unknown_code_stops() {
        let sim = Sim::new();
        let mut ctl = sim.controller();

        run(&mut ctl, 42).unwrap();
        assert!(sim.output().contains("{[(<State Machine Failed!>)]}"));
        assert!(sim.published().is_empty());
    }

    #[test]
    fn test_grab_then_takeoff() {
        let sim = Sim::new()
            .with_script(ScriptKind::Layered, "grab.auto", "MR")
            .with_script(ScriptKind::Basic, "takeoff", "TAKEOFF");
        let mut ctl = sim.controller();
        let mut sm = StateMachine::new(Grab);

        sm.step(&mut ctl).unwrap();
        assert_eq!(sm.phase(), Patrol);
        assert_eq!(sim.outputs().len(), 3);
        assert!(sim.output().contains("[ECHO_2000] TAKEOFF"));
    }
}
