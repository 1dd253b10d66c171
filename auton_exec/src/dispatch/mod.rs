//! # Reactive target dispatcher
//!
//! Watches the operator's confirm signal and, on each rising edge, drives the robot to the
//! registry target selected by the current target index.
//!
//! The target index is written by the telemetry synchroniser on its own thread, and read here on
//! the main control cycle. It is held in a [`TargetIndexCell`], a single atomic value with one
//! writer. A new value is visible to the dispatcher at the latest one synchroniser period after it
//! was set on the dashboard.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    convert::TryFrom,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::{debug, info, warn};

use crate::{
    field::{Alliance, Pose},
    motion::{CommandHandle, MotionCtrl},
    registry::AlliancePoseRegistry,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Detects false to true transitions of a boolean signal.
#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    state: EdgeState,
}

/// Shared target index.
///
/// Only the telemetry synchroniser stores into the cell, any number of readers may load from it.
#[derive(Debug, Clone)]
pub struct TargetIndexCell(Arc<AtomicI64>);

pub struct Dispatcher<H: CommandHandle> {
    edge: EdgeDetector,

    target_index: TargetIndexCell,

    /// Registry group the target index selects from
    group: String,

    /// Drive command currently in progress
    current: Option<H>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeState {
    /// No observation made yet
    Idle,

    /// Last observation was false, a true observation is a rising edge
    ArmedLow,

    /// Last observation was true
    ArmedHigh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// No rising edge this tick
    Idle,

    /// A rising edge was seen but dispatching is not enabled in the current mode
    Suppressed,

    Dispatched { index: i64, pose: Pose },

    /// A rising edge was seen but the dispatch could not be made
    Dropped(DispatchError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("Target index {index} does not exist in group {group:?}")]
    TargetNotFound { index: i64, group: String },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for EdgeState {
    fn default() -> Self {
        EdgeState::Idle
    }
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EdgeState {
        self.state
    }

    /// Observe the signal, returning true if this observation is a rising edge.
    ///
    /// The first observation only establishes the baseline, a signal which is already held true
    /// when observation begins does not trigger.
    pub fn observe(&mut self, signal: bool) -> bool {
        let (next, rising) = match (self.state, signal) {
            (EdgeState::Idle, false) => (EdgeState::ArmedLow, false),
            (EdgeState::Idle, true) => (EdgeState::ArmedHigh, false),
            (EdgeState::ArmedLow, false) => (EdgeState::ArmedLow, false),
            (EdgeState::ArmedLow, true) => (EdgeState::ArmedHigh, true),
            (EdgeState::ArmedHigh, false) => (EdgeState::ArmedLow, false),
            (EdgeState::ArmedHigh, true) => (EdgeState::ArmedHigh, false),
        };

        self.state = next;
        rising
    }

    /// Forget the baseline.
    pub fn reset(&mut self) {
        self.state = EdgeState::Idle;
    }
}

impl TargetIndexCell {
    pub fn new(initial: i64) -> Self {
        Self(Arc::new(AtomicI64::new(initial)))
    }

    pub fn load(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn store(&self, index: i64) {
        self.0.store(index, Ordering::Release)
    }
}

impl Default for TargetIndexCell {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<H: CommandHandle> Dispatcher<H> {
    pub fn new(group: &str, target_index: TargetIndexCell) -> Self {
        Self {
            edge: EdgeDetector::new(),
            target_index,
            group: group.to_string(),
            current: None,
        }
    }

    pub fn target_index(&self) -> &TargetIndexCell {
        &self.target_index
    }

    /// Returns true if a drive command issued by the dispatcher is still in progress.
    pub fn is_driving(&self) -> bool {
        self.current.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Process one observation of the confirm signal.
    ///
    /// The edge detector is fed on every tick whether or not dispatching is `enabled`, so enabling
    /// the dispatcher while the signal is held does not trigger a drive.
    pub fn tick<M>(
        &mut self,
        signal: bool,
        enabled: bool,
        alliance: Alliance,
        registry: &AlliancePoseRegistry,
        motion: &mut M,
    ) -> DispatchOutcome
    where
        M: MotionCtrl<Handle = H>,
    {
        if self.current.as_ref().map_or(false, |h| h.is_finished()) {
            debug!("Dispatched drive complete");
            self.current = None;
        }

        if !self.edge.observe(signal) {
            return DispatchOutcome::Idle;
        }

        if !enabled {
            debug!("Confirm signal ignored, dispatching is not enabled");
            return DispatchOutcome::Suppressed;
        }

        let index = self.target_index.load();

        let pose = match self.resolve(index, alliance, registry) {
            Ok(p) => p,
            Err(e) => {
                warn!("Dispatch dropped: {}", e);
                return DispatchOutcome::Dropped(e);
            }
        };

        self.cancel();

        info!(
            "Dispatching drive to {} target {} at {} ({} alliance)",
            self.group, index, pose, alliance
        );
        self.current = Some(motion.drive_to(pose));

        DispatchOutcome::Dispatched { index, pose }
    }

    /// Cancel the drive command in progress, if any.
    pub fn cancel(&mut self) {
        if let Some(mut h) = self.current.take() {
            if !h.is_finished() {
                debug!("Cancelling dispatched drive");
                h.cancel();
            }
        }
    }

    fn resolve(
        &self,
        index: i64,
        alliance: Alliance,
        registry: &AlliancePoseRegistry,
    ) -> Result<Pose, DispatchError> {
        u32::try_from(index)
            .ok()
            .and_then(|id| registry.get(&self.group, id, alliance).ok())
            .ok_or_else(|| DispatchError::TargetNotFound {
                index,
                group: self.group.clone(),
            })
    }
}
