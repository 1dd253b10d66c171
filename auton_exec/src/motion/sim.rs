//! # Simulated motion control
//!
//! A kinematic stand-in for the real motion control subsystem. Commands complete after the time it
//! would take to cover their distance at the robot's maximum speed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use super::{CommandHandle, MotionCtrl};
use crate::{field::Pose, segment::Segment};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct SimMotion {
    max_speed_ms: f64,

    /// Simulated position estimate
    estimate: Option<Pose>,

    /// Every request made of the simulation, in order
    calls: Vec<SimMotionCall>,
}

#[derive(Debug)]
pub struct SimHandle {
    finish_at: Instant,
    cancelled: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimMotionCall {
    Follow(String),
    ResetEstimate(Pose),
    DriveTo(Pose),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimMotion {
    pub fn new(max_speed_ms: f64) -> Self {
        Self {
            max_speed_ms,
            estimate: None,
            calls: Vec::new(),
        }
    }

    pub fn estimate(&self) -> Option<Pose> {
        self.estimate
    }

    pub fn calls(&self) -> &[SimMotionCall] {
        &self.calls
    }

    fn travel_time(&self, dist_m: f64) -> Duration {
        if self.max_speed_ms > 0.0 {
            util::time::seconds_to_std(dist_m / self.max_speed_ms)
        } else {
            Duration::from_secs(0)
        }
    }
}

impl MotionCtrl for SimMotion {
    type Handle = SimHandle;

    fn follow(&mut self, segment: &Segment) -> SimHandle {
        let duration = self.travel_time(segment.length_m());
        info!(
            "SimMotion following {:?} ({:.2} m, {:.2} s)",
            segment.id(),
            segment.length_m(),
            duration.as_secs_f64()
        );

        self.calls.push(SimMotionCall::Follow(segment.id().to_string()));
        self.estimate = Some(segment.last_pose());

        SimHandle::new(duration)
    }

    fn reset_estimate(&mut self, pose: Pose) {
        info!("SimMotion estimate reset to {}", pose);

        self.calls.push(SimMotionCall::ResetEstimate(pose));
        self.estimate = Some(pose);
    }

    fn drive_to(&mut self, pose: Pose) -> SimHandle {
        let dist_m = self
            .estimate
            .map(|e| e.position.distance_to(&pose.position))
            .unwrap_or(0.0);
        let duration = self.travel_time(dist_m);
        debug!("SimMotion driving to {} ({:.2} m)", pose, dist_m);

        self.calls.push(SimMotionCall::DriveTo(pose));
        self.estimate = Some(pose);

        SimHandle::new(duration)
    }
}

impl SimHandle {
    fn new(duration: Duration) -> Self {
        Self {
            finish_at: Instant::now() + duration,
            cancelled: false,
        }
    }
}

impl CommandHandle for SimHandle {
    fn is_finished(&self) -> bool {
        self.cancelled || Instant::now() >= self.finish_at
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}
