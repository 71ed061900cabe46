//! # Data Store

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::telem::{FlightStatus, TelemMsg, Target};
use log::{debug, info, warn};
use nalgebra::Vector3;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::params::{ParamSet, TimingParams};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Debug, Default)]
pub struct DataStore {
    /// Flight parameter registers
    pub params: ParamSet,

    /// File the flight parameters are (re)loaded from
    pub param_file: Option<PathBuf>,

    /// Latest target detections
    pub detections: Detections,

    /// Last status reported by the flight controller
    pub drone_status: FlightStatus,

    /// Interrupt and abort signals, shared with the signal listener
    pub signals: Signals,

    /// Set by the return to base recovery, read when the car can't be found
    pub return_to_base: bool,

    pub timing: TimingParams,
}

/// One latched detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionLatch {
    /// Most recent pose of the target
    pub pose: Vector3<f32>,

    pub detected: bool,
}

/// The latches of every tracked target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detections {
    pub circle: DetectionLatch,
    pub car: DetectionLatch,
    pub tape: DetectionLatch,
}

/// Interrupt and abort signals.
///
/// Clones share the same flags so the signal listener thread can raise them while the engine
/// runs.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    /// Soft abort of the innermost running frame, consumed by the first frame to see it
    interrupt: Arc<AtomicBool>,

    /// Operator abort, forces the mission into manual until rearmed
    abort: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DataStore {
    /// Merge one telemetry message into the store.
    pub fn apply(&mut self, msg: TelemMsg) {
        match msg {
            TelemMsg::Status(s) => {
                if s != self.drone_status {
                    debug!("Drone status: {:?}", s);
                }
                self.drone_status = s;
            }
            TelemMsg::Pose { target, pose_m } => {
                let pose = Vector3::new(pose_m[0], pose_m[1], pose_m[2]);
                debug!("{:?} seen at {:?}", target, pose_m);
                self.detections.latch_mut(target).set(pose);
            }
        }
    }

    /// True if the flight controller can accept a new movement.
    pub fn is_ready(&self) -> bool {
        self.drone_status.is_ready()
    }

    /// Reload the flight parameters from the parameter file.
    ///
    /// Failures are logged and leave every register unchanged.
    pub fn reload_params(&mut self) -> bool {
        let path = match self.param_file {
            Some(ref p) => p,
            None => {
                warn!("No flight parameter file set, keeping current parameters");
                return false;
            }
        };

        match ParamSet::load_file(path) {
            Ok(p) => {
                self.params = p;
                info!("Flight parameters loaded from {:?}", path);
                true
            }
            Err(e) => {
                warn!(
                    "Could not load flight parameters from {:?}, keeping current parameters: {}",
                    path, e
                );
                false
            }
        }
    }
}

impl DetectionLatch {
    pub fn set(&mut self, pose: Vector3<f32>) {
        self.pose = pose;
        self.detected = true;
    }

    pub fn clear(&mut self) {
        self.detected = false;
    }

    /// Get the pose if the target was detected, clearing the latch.
    pub fn take(&mut self) -> Option<Vector3<f32>> {
        if self.detected {
            self.detected = false;
            Some(self.pose)
        } else {
            None
        }
    }
}

impl Default for DetectionLatch {
    fn default() -> Self {
        Self {
            pose: Vector3::zeros(),
            detected: false,
        }
    }
}

impl Detections {
    pub fn latch(&self, target: Target) -> &DetectionLatch {
        match target {
            Target::Circle => &self.circle,
            Target::Car => &self.car,
            Target::Tape => &self.tape,
        }
    }

    pub fn latch_mut(&mut self, target: Target) -> &mut DetectionLatch {
        match target {
            Target::Circle => &mut self.circle,
            Target::Car => &mut self.car,
            Target::Tape => &mut self.tape,
        }
    }
}

impl Signals {
    pub fn raise_interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// Consume a raised interrupt, returning whether one was raised.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::SeqCst)
    }

    pub fn interrupt_raised(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Operator abort: interrupts the running frame and forces the mission into manual.
    pub fn raise_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
        self.raise_interrupt();
    }

    pub fn abort_raised(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Clear the abort so the mission can be started again.
    pub fn rearm(&self) {
        self.abort.store(false, Ordering::SeqCst);
    }
}
