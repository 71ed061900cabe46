//! # Synchronisation primitives
//!
//! Blocking waits used by the command language. None of them spawn a thread: they sleep in short
//! ticks and run the message pump on every tick, so telemetry keeps flowing into the data store
//! while the engine waits. Every wait gives up as soon as an interrupt is raised, leaving the
//! interrupt for the running frame to consume.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::telem::Target;
use log::warn;
use std::time::Duration;

use crate::{controller::Controller, data_store::Detections};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Source of time for the waits.
pub trait Clock {
    /// Block for the given number of seconds.
    fn sleep(&mut self, secs: f64);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition was met, or the time elapsed
    Satisfied,

    /// An interrupt was raised while waiting
    Interrupted,
}

/// The detection latches a wait can be satisfied by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchSelect {
    One(Target),
    Either(Target, Target),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Clock for SystemClock {
    fn sleep(&mut self, secs: f64) {
        if secs > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

impl LatchSelect {
    pub fn is_set(&self, d: &Detections) -> bool {
        match *self {
            LatchSelect::One(t) => d.latch(t).detected,
            LatchSelect::Either(a, b) => d.latch(a).detected || d.latch(b).detected,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Wait for a fixed time, pumping messages every pump period.
pub fn wait_duration(ctl: &mut Controller, secs: f64) -> WaitOutcome {
    let period = ctl.ds.timing.pump_period_s;
    let mut remaining = secs;

    ctl.pump();

    while remaining > 1e-9 {
        if ctl.ds.signals.interrupt_raised() {
            return WaitOutcome::Interrupted;
        }

        let tick = if period > 0.0 {
            remaining.min(period)
        } else {
            remaining
        };
        ctl.clock.sleep(tick);
        remaining -= tick;

        ctl.pump();
    }

    WaitOutcome::Satisfied
}

/// Wait until the flight controller reports it is ready.
pub fn wait_ready(ctl: &mut Controller) -> WaitOutcome {
    poll_until(ctl, |c| c.ds.is_ready())
}

/// Wait until one of the selected detection latches is set.
pub fn wait_latches(ctl: &mut Controller, select: LatchSelect) -> WaitOutcome {
    poll_until(ctl, move |c| select.is_set(&c.ds.detections))
}

/// Settle, then poll the condition at the poll rate showing a heartbeat.
fn poll_until<F>(ctl: &mut Controller, condition: F) -> WaitOutcome
where
    F: Fn(&Controller) -> bool,
{
    let timing = ctl.ds.timing;

    if wait_duration(ctl, timing.settle_s) == WaitOutcome::Interrupted {
        return WaitOutcome::Interrupted;
    }

    let mut beat = false;

    loop {
        if ctl.ds.signals.interrupt_raised() {
            return WaitOutcome::Interrupted;
        }
        if condition(ctl) {
            return WaitOutcome::Satisfied;
        }

        beat = !beat;
        if beat {
            warn!(". >>> .");
        } else {
            warn!(". <<< .");
        }

        ctl.pump();
        ctl.clock.sleep(timing.poll_period_s());
    }
}
