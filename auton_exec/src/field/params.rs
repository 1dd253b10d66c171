//! # Field parameters
//!
//! Parameters describing the field dimensions and the canonical (blue) named targets, loaded from
//! `field.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use super::{Angle, Field, Pose, FIELD_LENGTH_M, FIELD_WIDTH_M};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FieldParams {
    /// Length of the field along the long axis, which the alliance mirror is taken about.
    #[serde(default = "default_length_m")]
    pub length_m: f64,

    /// Width of the field
    #[serde(default = "default_width_m")]
    pub width_m: f64,

    /// Individually authored targets, in the blue frame.
    #[serde(default)]
    pub targets: Vec<TargetParams>,

    /// Reef geometry from which the reef branch targets are generated.
    pub reef: Option<ReefParams>,
}

/// A single named target authored in the blue frame.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetParams {
    pub group: String,
    pub id: u32,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_deg: f64,
}

/// Geometry of the hexagonal reef.
///
/// The reef has six faces with two scoring branches on each, giving twelve targets numbered
/// anticlockwise starting from the left branch of the face nearest the blue driver station.
#[derive(Debug, Clone, Deserialize)]
pub struct ReefParams {
    /// Group name the generated targets are placed in
    pub group: String,

    /// Centre of the reef in the blue frame
    pub centre_m: [f64; 2],

    /// Distance from the reef centre to the middle of each face
    pub face_dist_m: f64,

    /// Separation between the two branches on one face
    pub branch_sep_m: f64,

    /// Distance between the face and the robot's reference point when scoring
    pub standoff_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FieldParams {
    pub fn field(&self) -> Field {
        Field::new(self.length_m, self.width_m)
    }
}

impl TargetParams {
    pub fn pose(&self) -> Pose {
        Pose::new(self.x_m, self.y_m, Angle::from_deg(self.heading_deg))
    }
}

fn default_length_m() -> f64 {
    FIELD_LENGTH_M
}

fn default_width_m() -> f64 {
    FIELD_WIDTH_M
}
