//! Reef branch target generation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::PI;

use nalgebra::Vector2;

use super::NamedTarget;
use crate::field::{Angle, Pose, Position, ReefParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of faces on the reef
const NUM_FACES: u32 = 6;

/// Number of branches on each face
const BRANCHES_PER_FACE: u32 = 2;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Generate the blue-frame scoring pose in front of each reef branch.
///
/// Face 0 faces the blue driver station (-x), subsequent faces follow anticlockwise. On each face
/// branch 0 is on the robot's left as it faces the reef.
pub(super) fn branch_targets(params: &ReefParams) -> Vec<NamedTarget> {
    let centre = Vector2::new(params.centre_m[0], params.centre_m[1]);
    let half_sep = 0.5 * params.branch_sep_m;

    let mut targets = Vec::with_capacity((NUM_FACES * BRANCHES_PER_FACE) as usize);

    for face in 0..NUM_FACES {
        // Outward normal of the face
        let normal_rad = PI + face as f64 * 2.0 * PI / NUM_FACES as f64;
        let normal = Vector2::new(normal_rad.cos(), normal_rad.sin());

        // The robot faces into the reef, its left is the normal rotated by -90 degrees
        let left = Vector2::new(normal[1], -normal[0]);

        let face_point = centre + (params.face_dist_m + params.standoff_m) * normal;

        for branch in 0..BRANCHES_PER_FACE {
            let side = if branch == 0 { 1.0 } else { -1.0 };
            let position: Position = (face_point + side * half_sep * left).into();

            targets.push(NamedTarget {
                group: params.group.clone(),
                id: face * BRANCHES_PER_FACE + branch,
                blue_pose: Pose {
                    position,
                    heading: Angle::from_rad(normal_rad + PI),
                },
            });
        }
    }

    targets
}

#[cfg(test)]
mod test {
    use super::*;

    fn reef_params() -> ReefParams {
        ReefParams {
            group: "reef".into(),
            centre_m: [4.4895, 4.0259],
            face_dist_m: 0.8315,
            branch_sep_m: 0.3287,
            standoff_m: 0.5,
        }
    }

    #[test]
    fn test_branch_targets() {
        let params = reef_params();
        let targets = branch_targets(&params);
        let centre = Position::new(params.centre_m[0], params.centre_m[1]);

        assert_eq!(targets.len(), 12);

        for (i, t) in targets.iter().enumerate() {
            assert_eq!(t.id, i as u32);
            assert_eq!(t.group, "reef");

            // Every branch pose sits the same distance from the reef centre
            let expected = (1.3315f64.powi(2) + (0.5 * 0.3287f64).powi(2)).sqrt();
            assert!((t.blue_pose.position.distance_to(&centre) - expected).abs() < 1e-9);
        }

        // Face 0 is on the driver station side and the robot faces +x into the reef
        let t0 = &targets[0];
        assert!(t0.blue_pose.position.x_m < centre.x_m);
        assert!(t0.blue_pose.heading.approx_eq(&Angle::from_rad(0.0), 1e-9));

        // Left branch is at higher y when facing +x
        assert!(targets[0].blue_pose.position.y_m > targets[1].blue_pose.position.y_m);
    }
}
