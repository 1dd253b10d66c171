//! # Autonomous module
//!
//! Builds autonomous programs from precomputed segments and runs them against the motion control
//! subsystem.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod program;
mod runner;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::{AutonParams, ResetPolicy, RobotConfig, RoutineParams};
pub use program::{BuildError, Program, ProgramBuilder, ProgramError, Step};
pub use runner::{CancelToken, ProgramRunner, RunnerStatus};
