//! # Field geometry module
//!
//! Defines the field-fixed geometry types used throughout the autonomy core, and the transform
//! between the two alliances' views of the field.
//!
//! All field data is authored once in the blue (canonical) frame. The red view is derived by a 180
//! degree rotation about the centre line of the field, which reduces to mirroring the x coordinate
//! about the field length and reflecting the heading about the y axis:
//!
//! ```text
//! mirror((x, y, θ)) = (L - x, y, π - θ)
//! ```
//!
//! This transform is its own inverse, so there is no separate "unmirror".

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
pub use params::{FieldParams, ReefParams, TargetParams};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::{get_ang_dist_2pi, wrap_to_pi};

pub use comms_if::fms::Alliance;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest angular distance at which two angles still compare equal.
const ANGLE_EQ_EPSILON_RAD: f64 = 1e-12;

/// Number of meters in an inch
const INCHES_TO_M: f64 = 0.0254;

/// Length of the competition field along its long axis.
pub const FIELD_LENGTH_M: f64 = 690.875 * INCHES_TO_M;

/// Width of the competition field.
pub const FIELD_WIDTH_M: f64 = 317.0 * INCHES_TO_M;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planar angle in radians.
///
/// Angles are stored normalised into (-pi, pi]. Two angles which are equal modulo 2pi compare equal,
/// up to the round-off left behind by normalisation.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Angle {
    rad: f64,
}

/// A position on the field, in meters, in the blue alliance frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x_m: f64,
    pub y_m: f64,
}

/// A position and heading on the field.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub heading: Angle,
}

/// The dimensions of the field.
///
/// Only the length takes part in the alliance transform, the width is kept for bounds checking
/// and display.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub length_m: f64,
    pub width_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Angle {
    pub fn from_rad(rad: f64) -> Self {
        Self {
            rad: wrap_to_pi(rad),
        }
    }

    pub fn from_deg(deg: f64) -> Self {
        Self::from_rad(deg.to_radians())
    }

    /// The angle in radians, in the range (-pi, pi].
    pub fn rad(&self) -> f64 {
        self.rad
    }

    pub fn deg(&self) -> f64 {
        self.rad.to_degrees()
    }

    /// Returns true if the shortest distance between the two angles is within `tol_rad`.
    pub fn approx_eq(&self, other: &Angle, tol_rad: f64) -> bool {
        get_ang_dist_2pi(self.rad, other.rad).abs() <= tol_rad
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, ANGLE_EQ_EPSILON_RAD)
    }
}

impl From<f64> for Angle {
    fn from(rad: f64) -> Self {
        Self::from_rad(rad)
    }
}

impl From<Angle> for f64 {
    fn from(angle: Angle) -> Self {
        angle.rad
    }
}

impl Position {
    pub fn new(x_m: f64, y_m: f64) -> Self {
        Self { x_m, y_m }
    }

    pub fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    /// Euclidian distance between two positions.
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.as_vector() - other.as_vector()).norm()
    }
}

impl From<Vector2<f64>> for Position {
    fn from(v: Vector2<f64>) -> Self {
        Self::new(v[0], v[1])
    }
}

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading: Angle) -> Self {
        Self {
            position: Position::new(x_m, y_m),
            heading,
        }
    }

    /// Returns true if both position and heading agree within the given tolerances.
    pub fn approx_eq(&self, other: &Pose, tol_m: f64, tol_rad: f64) -> bool {
        self.position.distance_to(&other.position) <= tol_m
            && self.heading.approx_eq(&other.heading, tol_rad)
    }

    /// The pose as an `[x_m, y_m, heading_rad]` triple, for dashboard display.
    pub fn to_array(&self) -> [f64; 3] {
        [self.position.x_m, self.position.y_m, self.heading.rad()]
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.4} m, {:.4} m, {:.2} deg)",
            self.position.x_m,
            self.position.y_m,
            self.heading.deg()
        )
    }
}

impl Default for Field {
    fn default() -> Self {
        Self {
            length_m: FIELD_LENGTH_M,
            width_m: FIELD_WIDTH_M,
        }
    }
}

impl Field {
    pub fn new(length_m: f64, width_m: f64) -> Self {
        Self { length_m, width_m }
    }

    /// Mirror a position onto the other alliance's side of the field.
    pub fn mirror_position(&self, p: Position) -> Position {
        Position::new(self.length_m - p.x_m, p.y_m)
    }

    /// Mirror a pose onto the other alliance's side of the field.
    pub fn mirror_pose(&self, pose: Pose) -> Pose {
        Pose {
            position: self.mirror_position(pose.position),
            heading: mirror_angle(pose.heading),
        }
    }

    /// Express a canonical (blue) pose in the given alliance's view.
    pub fn pose_for(&self, pose: Pose, alliance: Alliance) -> Pose {
        match alliance {
            Alliance::Blue => pose,
            Alliance::Red => self.mirror_pose(pose),
        }
    }

    /// Returns true if the position lies within the field boundary.
    pub fn contains(&self, p: &Position) -> bool {
        (0.0..=self.length_m).contains(&p.x_m) && (0.0..=self.width_m).contains(&p.y_m)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Mirror a heading onto the other alliance's side of the field.
pub fn mirror_angle(a: Angle) -> Angle {
    Angle::from_rad(std::f64::consts::PI - a.rad())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-9;

    fn sample_poses() -> Vec<Pose> {
        let mut poses = Vec::new();
        for i in 0..25 {
            let x = -2.0 + 0.9 * i as f64;
            let y = 8.0 - 0.37 * i as f64;
            let h = -4.0 * PI + 0.61 * i as f64;
            poses.push(Pose::new(x, y, Angle::from_rad(h)));
        }
        poses.push(Pose::new(0.0, 0.0, Angle::from_rad(PI)));
        poses.push(Pose::new(0.0, 0.0, Angle::from_rad(-PI)));
        poses.push(Pose::new(0.0, 0.0, Angle::from_rad(PI / 2.0)));
        poses
    }

    #[test]
    fn test_angle_normalisation() {
        assert_eq!(Angle::from_rad(PI), Angle::from_rad(-PI));
        assert_eq!(Angle::from_rad(0.0), Angle::from_rad(0.0));
        assert!(Angle::from_rad(5.0 * PI).approx_eq(&Angle::from_rad(PI), TOL));
        assert!(Angle::from_deg(-126.0).approx_eq(&Angle::from_deg(234.0), TOL));
        assert!(Angle::from_rad(1e-12).approx_eq(&Angle::from_rad(-1e-12), TOL));
        assert!(!Angle::from_rad(0.1).approx_eq(&Angle::from_rad(-0.1), TOL));
    }

    #[test]
    fn test_angle_eq_mod_2pi() {
        for i in 0..200 {
            let x = -3.0 + 0.03 * i as f64;
            assert_eq!(Angle::from_rad(x), Angle::from_rad(x + 2.0 * PI), "x = {}", x);
            assert_eq!(Angle::from_rad(x), Angle::from_rad(x - 4.0 * PI), "x = {}", x);
            assert_ne!(Angle::from_rad(x), Angle::from_rad(x + 1e-6), "x = {}", x);
        }
    }

    #[test]
    fn test_mirror_values() {
        let field = Field::new(16.0, 8.0);

        let p = field.mirror_position(Position::new(1.0, 2.0));
        assert_eq!(p, Position::new(15.0, 2.0));

        // Facing the red wall from blue becomes facing the blue wall from red
        assert!(mirror_angle(Angle::from_rad(0.0)).approx_eq(&Angle::from_rad(PI), TOL));
        // Facing along +y is unchanged by the mirror
        assert!(mirror_angle(Angle::from_rad(PI / 2.0)).approx_eq(&Angle::from_rad(PI / 2.0), TOL));
        assert!(mirror_angle(Angle::from_deg(-126.0)).approx_eq(&Angle::from_deg(-54.0), TOL));
    }

    #[test]
    fn test_mirror_is_involution() {
        let field = Field::default();

        for pose in sample_poses() {
            let twice = field.mirror_pose(field.mirror_pose(pose));
            assert!(
                twice.approx_eq(&pose, TOL, TOL),
                "{} mirrored twice gave {}",
                pose,
                twice
            );
        }
    }

    #[test]
    fn test_reef_centres_mirror() {
        // The two alliances' reef centres are each other's mirror image
        let field = Field::default();
        let blue_reef = Position::new(4.4895, 4.0259);
        let red_reef = field.mirror_position(blue_reef);

        assert!((red_reef.x_m - 13.0588).abs() < 1e-3);
        assert_eq!(red_reef.y_m, blue_reef.y_m);
    }

    #[test]
    fn test_pose_for() {
        let field = Field::default();
        let pose = Pose::new(1.0, 1.0, Angle::from_deg(30.0));

        assert_eq!(field.pose_for(pose, Alliance::Blue), pose);
        assert_eq!(field.pose_for(pose, Alliance::Red), field.mirror_pose(pose));
    }

    #[test]
    fn test_angle_serde() {
        let json = serde_json::to_string(&Angle::from_rad(3.0 * PI)).unwrap();
        let angle: Angle = serde_json::from_str(&json).unwrap();
        assert!(angle.approx_eq(&Angle::from_rad(PI), TOL));

        // Deserialising an unnormalised value normalises it
        let angle: Angle = serde_json::from_str("7.0").unwrap();
        assert!(angle.rad() <= PI && angle.rad() > -PI);
    }
}
