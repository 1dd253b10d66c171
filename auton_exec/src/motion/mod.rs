//! # Motion control interface
//!
//! The autonomy core does not drive motors or close any control loops itself. It hands segments and
//! target poses to a motion control collaborator implementing [`MotionCtrl`], and tracks the
//! progress of each request through the returned [`CommandHandle`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod sim;
pub use sim::{SimHandle, SimMotion, SimMotionCall};

#[cfg(test)]
pub(crate) mod mock;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{field::Pose, segment::Segment};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Handle to a motion command in progress.
pub trait CommandHandle {
    /// Returns true once the command has completed or been cancelled.
    fn is_finished(&self) -> bool;

    /// Stop the command. The command owns the handling of its own partial progress.
    fn cancel(&mut self);
}

/// The motion control subsystem.
pub trait MotionCtrl {
    type Handle: CommandHandle;

    /// Begin following the given segment.
    fn follow(&mut self, segment: &Segment) -> Self::Handle;

    /// Overwrite the position estimate with the given pose.
    fn reset_estimate(&mut self, pose: Pose);

    /// Begin driving to the given pose.
    fn drive_to(&mut self, pose: Pose) -> Self::Handle;
}
