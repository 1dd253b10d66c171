//! # Autonomous programs
//!
//! A [`Program`] is an ordered list of [`Step`]s composed from independently generated segments.
//! Programs are built once per autonomous mode entry by a [`ProgramBuilder`], and can be inspected
//! (start pose, full pose trace) before anything is executed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use super::RobotConfig;
use crate::{
    field::{Alliance, Angle, Field, Pose},
    segment::{Segment, SegmentLoadError, SegmentLoader},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A built autonomous program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    steps: Vec<Step>,
}

/// Composes loaded segments into a [`Program`].
pub struct ProgramBuilder<'a, L: SegmentLoader + ?Sized> {
    loader: &'a L,
    robot_config: Option<&'a RobotConfig>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Overwrite the position estimate with this pose.
    ResetPosition(Pose),

    FollowSegment(Segment),
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Segment {index} of the program could not be loaded: {cause}")]
    SegmentLoad {
        index: usize,
        #[source]
        cause: SegmentLoadError,
    },

    #[error("A position reset was requested but no robot configuration is available")]
    ConfigMissing,

    #[error("A position reset was requested but the program contains no segments")]
    NoSegmentForReset,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProgramError {
    #[error("The program contains no steps")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<'a, L: SegmentLoader + ?Sized> ProgramBuilder<'a, L> {
    pub fn new(loader: &'a L, robot_config: Option<&'a RobotConfig>) -> Self {
        Self {
            loader,
            robot_config,
        }
    }

    /// Build a program which follows the given segments in order.
    ///
    /// If `reset_first` is set the program starts by resetting the position estimate to the first
    /// waypoint of the first segment, with the heading given by `start_heading_hint`. This pose is
    /// in the blue frame, see [`Program::into_alliance`].
    ///
    /// Loading stops at the first segment which fails, and no program is returned.
    pub fn build<S: AsRef<str>>(
        &self,
        segment_ids: &[S],
        reset_first: bool,
        start_heading_hint: Angle,
    ) -> Result<Program, BuildError> {
        if reset_first && self.robot_config.is_none() {
            return Err(BuildError::ConfigMissing);
        }

        let mut segments = Vec::with_capacity(segment_ids.len());
        for (index, id) in segment_ids.iter().enumerate() {
            match self.loader.load(id.as_ref()) {
                Ok(s) => segments.push(s),
                Err(cause) => {
                    warn!("Could not load segment {} of the program: {}", index, cause);
                    return Err(BuildError::SegmentLoad { index, cause });
                }
            }
        }

        let mut steps = Vec::with_capacity(segments.len() + 1);

        if reset_first {
            let first = segments.first().ok_or(BuildError::NoSegmentForReset)?;
            steps.push(Step::ResetPosition(Pose {
                position: first.first_pose().position,
                heading: start_heading_hint,
            }));
        }

        steps.extend(segments.into_iter().map(Step::FollowSegment));

        info!(
            "Built program with {} steps ({} segments, reset: {})",
            steps.len(),
            segment_ids.len(),
            reset_first
        );

        Ok(Program { steps })
    }
}

impl Program {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The pose the robot is expected to start the program from.
    ///
    /// This is the reset pose if the program has one, otherwise the first waypoint of the first
    /// segment.
    pub fn starting_pose(&self) -> Result<Pose, ProgramError> {
        self.steps
            .iter()
            .find_map(|s| match s {
                Step::ResetPosition(p) => Some(*p),
                _ => None,
            })
            .or_else(|| self.segments().next().map(|s| s.first_pose()))
            .ok_or(ProgramError::Empty)
    }

    /// Iterate over every segment waypoint of the program, in step order.
    ///
    /// The iterator is cheap to clone, and the trace can be iterated any number of times.
    pub fn full_pose_trace(&self) -> impl Iterator<Item = &Pose> + Clone + '_ {
        self.segments().flat_map(|s| s.poses().iter())
    }

    /// The full pose trace as seen from the given alliance.
    pub fn pose_trace_for<'a>(
        &'a self,
        alliance: Alliance,
        field: &'a Field,
    ) -> impl Iterator<Item = Pose> + Clone + 'a {
        self.full_pose_trace()
            .map(move |p| field.pose_for(*p, alliance))
    }

    /// Adjust the program for the alliance the robot is starting on.
    ///
    /// Only reset poses are transformed. Segments stay in the blue frame and are flipped by the
    /// follower.
    pub fn into_alliance(self, alliance: Alliance, field: &Field) -> Program {
        debug!("Adjusting program for the {} alliance", alliance);

        let steps = self
            .steps
            .into_iter()
            .map(|s| match s {
                Step::ResetPosition(p) => Step::ResetPosition(field.pose_for(p, alliance)),
                s => s,
            })
            .collect();

        Program { steps }
    }

    fn segments(&self) -> impl Iterator<Item = &Segment> + Clone + '_ {
        self.steps.iter().filter_map(|s| match s {
            Step::FollowSegment(seg) => Some(seg),
            _ => None,
        })
    }
}
