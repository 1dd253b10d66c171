//! # Autonomy library.
//!
//! Planning and orchestration core of the robot's autonomous operation. Allows other crates in the
//! workspace, and the benchmarks, to access items defined inside the autonomy crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomous module - builds and runs programs composed from precomputed segments
pub mod auton;

/// Reactive dispatcher - drives to operator selected targets on a confirm signal
pub mod dispatch;

/// Field geometry - pose types and the transform between the two alliances' views of the field
pub mod field;

/// Motion control interface - the boundary to the drivebase control subsystem
pub mod motion;

/// Alliance pose registry - named field targets authored in the blue frame
pub mod registry;

/// Robot control - top level match mode management
pub mod robot_ctrl;

/// Segment loader - resolves segment ids to precomputed paths
pub mod segment;

/// Telemetry synchroniser - low rate dashboard synchronisation
pub mod telem;
