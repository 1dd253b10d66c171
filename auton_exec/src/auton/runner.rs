//! # Program runner
//!
//! Executes a [`Program`] against the motion control subsystem, advancing at most one command per
//! scheduler tick. The runner never blocks: each call to [`ProgramRunner::tick`] polls the current
//! command handle and returns.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info};

use super::{Program, Step};
use crate::motion::{CommandHandle, MotionCtrl};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cooperative cancellation signal for a running program.
///
/// Cancelling is cheap and may happen from anywhere, it is acted on by the runner at its next tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

pub struct ProgramRunner<H: CommandHandle> {
    steps: std::vec::IntoIter<Step>,

    /// Index of the step currently being executed
    step_index: usize,

    /// Handle of the command currently in progress
    current: Option<H>,

    cancel: CancelToken,

    status: RunnerStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunnerStatus {
    Running,
    Finished,
    Cancelled,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl<H: CommandHandle> ProgramRunner<H> {
    /// Create a runner for the given program. No commands are issued until the first tick.
    pub fn new(program: Program) -> Self {
        Self {
            steps: program.into_steps().into_iter(),
            step_index: 0,
            current: None,
            cancel: CancelToken::new(),
            status: RunnerStatus::Running,
        }
    }

    /// Get a token which cancels this runner.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> RunnerStatus {
        self.status
    }

    /// Advance the program.
    ///
    /// The next step is only started once the handle of the previous one reports finished. Reset
    /// steps complete as soon as the estimate has been set, so the following step is started in
    /// the same tick.
    pub fn tick<M>(&mut self, motion: &mut M) -> RunnerStatus
    where
        M: MotionCtrl<Handle = H>,
    {
        if self.status != RunnerStatus::Running {
            return self.status;
        }

        if self.cancel.is_cancelled() {
            if let Some(mut h) = self.current.take() {
                h.cancel();
            }
            info!("Program cancelled during step {}", self.step_index);
            self.status = RunnerStatus::Cancelled;
            return self.status;
        }

        if let Some(ref h) = self.current {
            if !h.is_finished() {
                return self.status;
            }

            debug!("Program step {} complete", self.step_index);
            self.current = None;
            self.step_index += 1;
        }

        for step in &mut self.steps {
            match step {
                Step::ResetPosition(pose) => {
                    motion.reset_estimate(pose);
                    debug!("Program step {} complete", self.step_index);
                    self.step_index += 1;
                }
                Step::FollowSegment(segment) => {
                    debug!(
                        "Program step {}: following segment {:?}",
                        self.step_index,
                        segment.id()
                    );
                    self.current = Some(motion.follow(&segment));
                    return self.status;
                }
            }
        }

        info!("Program finished after {} steps", self.step_index);
        self.status = RunnerStatus::Finished;
        self.status
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auton::{ProgramBuilder, RobotConfig},
        field::{Angle, Pose},
        motion::mock::{Call, RecordingMotion},
        segment::MemSegmentLoader,
    };

    fn program(reset: bool) -> Program {
        let loader = MemSegmentLoader::new()
            .with("A", vec![Pose::new(1.0, 2.0, Angle::default())])
            .with("B", vec![Pose::new(3.0, 2.0, Angle::default())]);
        let config = RobotConfig {
            mass_kg: 50.0,
            max_speed_ms: 4.0,
            loop_time_s: 0.02,
        };

        ProgramBuilder::new(&loader, Some(&config))
            .build(&["A", "B"], reset, Angle::from_deg(180.0))
            .unwrap()
    }

    #[test]
    fn test_sequential_execution() {
        let mut motion = RecordingMotion::new();
        let mut runner = ProgramRunner::new(program(true));

        // Reset and the first follow are issued together
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Running);
        assert_eq!(
            motion.calls,
            vec![
                Call::Reset(Pose::new(1.0, 2.0, Angle::from_deg(180.0))),
                Call::Follow("A".into())
            ]
        );

        // Nothing more is issued until A finishes
        runner.tick(&mut motion);
        runner.tick(&mut motion);
        assert_eq!(motion.calls.len(), 2);

        motion.finish(0);
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Running);
        assert_eq!(motion.calls[2], Call::Follow("B".into()));

        motion.finish(1);
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Finished);
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Finished);
        assert_eq!(motion.calls.len(), 3);
    }

    #[test]
    fn test_cancel() {
        let mut motion = RecordingMotion::new();
        let mut runner = ProgramRunner::new(program(false));
        let token = runner.cancel_token();

        runner.tick(&mut motion);
        assert_eq!(motion.calls, vec![Call::Follow("A".into())]);

        // Cancellation is only acted on at the next tick
        token.cancel();
        assert!(!motion.is_cancelled(0));

        assert_eq!(runner.tick(&mut motion), RunnerStatus::Cancelled);
        assert!(motion.is_cancelled(0));

        // No further steps are started
        motion.finish(0);
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Cancelled);
        assert_eq!(motion.calls.len(), 1);
    }

    #[test]
    fn test_cancel_before_start() {
        let mut motion = RecordingMotion::new();
        let mut runner = ProgramRunner::new(program(true));

        runner.cancel_token().cancel();
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Cancelled);
        assert!(motion.calls.is_empty());
    }

    #[test]
    fn test_empty_program() {
        let loader = MemSegmentLoader::new();
        let program = ProgramBuilder::new(&loader, None)
            .build::<&str>(&[], false, Angle::default())
            .unwrap();

        let mut motion = RecordingMotion::new();
        let mut runner = ProgramRunner::new(program);
        assert_eq!(runner.tick(&mut motion), RunnerStatus::Finished);
    }
}
