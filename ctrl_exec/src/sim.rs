//! Simulated collaborators for the controller.
//!
//! Time only advances when the engine sleeps and telemetry is delivered on a given poll of the
//! link, so waits can be tested without a flight controller or a real clock.

use comms_if::{flight_cmd::FlightCmd, telem::TelemMsg};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use util::script::{MemScriptStore, ScriptKind};

use crate::{
    console::Console,
    controller::{Controller, MotorOutputs},
    data_store::{DataStore, Signals},
    gpio::{Actuator, Level},
    link::{Link, LinkError},
    sync::Clock,
};

/// Something happening on a given poll of the link.
#[derive(Debug, Clone)]
pub enum Step {
    Telem(TelemMsg),

    /// Operator abort
    Abort,

    Interrupt,
}

pub struct Sim {
    state: Rc<RefCell<SimState>>,
    scripts: MemScriptStore,
}

#[derive(Default)]
struct SimState {
    signals: Signals,
    polls: usize,
    elapsed_s: f64,
    schedule: HashMap<usize, Vec<Step>>,
    published: Vec<FlightCmd>,
    shown: Vec<String>,
    clears: usize,
    outputs: Vec<(String, Level)>,
}

struct MockLink(Rc<RefCell<SimState>>);
struct SimClock(Rc<RefCell<SimState>>);
struct RecordingConsole(Rc<RefCell<SimState>>);
struct RecordingActuator(Rc<RefCell<SimState>>);

impl Sim {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::default())),
            scripts: MemScriptStore::new(),
        }
    }

    pub fn with_script(mut self, kind: ScriptKind, name: &str, text: &str) -> Self {
        self.scripts.insert(kind, name, text);
        self
    }

    /// Controller wired to this simulation.
    pub fn controller(&self) -> Controller {
        let ds = DataStore {
            signals: self.state.borrow().signals.clone(),
            ..Default::default()
        };

        Controller {
            ds,
            link: Box::new(MockLink(self.state.clone())),
            actuator: Box::new(RecordingActuator(self.state.clone())),
            clock: Box::new(SimClock(self.state.clone())),
            console: Box::new(RecordingConsole(self.state.clone())),
            scripts: Box::new(self.scripts.clone()),
            outputs: MotorOutputs {
                grab: "gpio157".into(),
                release: "gpio158".into(),
            },
            max_depth: 64,
            depth: 0,
        }
    }

    /// Make something happen on the given poll, counted from 0.
    pub fn schedule(&self, poll: usize, step: Step) {
        self.state
            .borrow_mut()
            .schedule
            .entry(poll)
            .or_default()
            .push(step);
    }

    pub fn polls(&self) -> usize {
        self.state.borrow().polls
    }

    pub fn elapsed_s(&self) -> f64 {
        self.state.borrow().elapsed_s
    }

    pub fn published(&self) -> Vec<FlightCmd> {
        self.state.borrow().published.clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.state.borrow().shown.clone()
    }

    /// Everything shown, one block per line.
    pub fn output(&self) -> String {
        self.state.borrow().shown.join("\n")
    }

    pub fn outputs(&self) -> Vec<(String, Level)> {
        self.state.borrow().outputs.clone()
    }

    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }
}

impl Link for MockLink {
    fn publish(&mut self, cmd: &FlightCmd) -> Result<(), LinkError> {
        self.0.borrow_mut().published.push(*cmd);
        Ok(())
    }

    fn poll(&mut self) -> Vec<TelemMsg> {
        let mut state = self.0.borrow_mut();
        let idx = state.polls;
        state.polls += 1;

        let mut msgs = Vec::new();
        for step in state.schedule.remove(&idx).unwrap_or_default() {
            match step {
                Step::Telem(m) => msgs.push(m),
                Step::Abort => state.signals.raise_abort(),
                Step::Interrupt => state.signals.raise_interrupt(),
            }
        }

        msgs
    }
}

impl Clock for SimClock {
    fn sleep(&mut self, secs: f64) {
        self.0.borrow_mut().elapsed_s += secs.max(0.0);
    }
}

impl Console for RecordingConsole {
    fn show(&mut self, text: &str) {
        self.0.borrow_mut().shown.push(text.to_string());
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clears += 1;
    }
}

impl Actuator for RecordingActuator {
    fn set_output(&mut self, name: &str, level: Level) {
        self.0.borrow_mut().outputs.push((name.to_string(), level));
    }
}
