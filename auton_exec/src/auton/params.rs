//! # Autonomous parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::field::Angle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for autonomous routine selection and construction.
#[derive(Debug, Clone, Deserialize)]
pub struct AutonParams {
    /// Directory holding the segment files, relative to the software root.
    pub segment_dir: String,

    /// Routine used when the dashboard chooser has nothing selected.
    pub default_routine: String,

    /// Dashboard key of the routine chooser.
    pub chooser_key: String,

    /// Dashboard key the selected routine's pose trace is published on.
    pub trace_key: String,

    /// Registry group used by the reactive dispatcher.
    pub dispatch_group: String,

    /// Dashboard key of the dispatcher's confirm signal.
    pub confirm_key: String,

    pub routines: Vec<RoutineParams>,
}

/// A single autonomous routine.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutineParams {
    pub name: String,

    /// Segment ids, in execution order.
    pub segments: Vec<String>,

    /// When to seed the position estimate before the first segment.
    #[serde(default)]
    pub reset: ResetPolicy,

    /// Seed heading used for the reset pose.
    #[serde(default)]
    pub start_heading_deg: f64,
}

/// Physical configuration of the robot.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    pub mass_kg: f64,

    /// Maximum linear speed of the drivebase.
    pub max_speed_ms: f64,

    /// Period of the main control loop.
    pub loop_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    Always,
    Never,

    /// Only reset the estimate when running against simulated motion. A real robot is localised by
    /// its own sensors before the match starts.
    SimulationOnly,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ResetPolicy {
    fn default() -> Self {
        ResetPolicy::SimulationOnly
    }
}

impl ResetPolicy {
    pub fn reset_first(&self, simulation: bool) -> bool {
        match self {
            ResetPolicy::Always => true,
            ResetPolicy::Never => false,
            ResetPolicy::SimulationOnly => simulation,
        }
    }
}

impl AutonParams {
    /// Find the routine with the given name.
    pub fn routine(&self, name: &str) -> Option<&RoutineParams> {
        self.routines.iter().find(|r| r.name == name)
    }
}

impl RoutineParams {
    pub fn start_heading(&self) -> Angle {
        Angle::from_deg(self.start_heading_deg)
    }
}
