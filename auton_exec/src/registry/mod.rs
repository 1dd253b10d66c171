//! # Alliance Pose Registry
//!
//! A catalog of named field locations (chute stations, reef branches). Every target is authored
//! exactly once in the blue frame; its red variant is derived from it by the field mirror when the
//! registry is built and can never be set independently.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod reef;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashSet;

use log::debug;
use ordered_float::OrderedFloat;

use crate::field::{Alliance, Field, FieldParams, Pose, Position};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A catalog entry mapping a symbolic `(group, id)` to a canonical field pose.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTarget {
    pub group: String,
    pub id: u32,
    pub blue_pose: Pose,
}

/// The registry of named targets.
#[derive(Debug, Clone)]
pub struct AlliancePoseRegistry {
    field: Field,

    targets: Vec<NamedTarget>,

    /// Red variant of `targets[i]`, always `field.mirror_pose(targets[i].blue_pose)`.
    red_poses: Vec<Pose>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("No target with id {id} in group {group:?}")]
    NotFound { group: String, id: u32 },

    #[error("Group {0:?} contains no targets")]
    GroupEmpty(String),

    #[error("Target {id} in group {group:?} is defined more than once")]
    DuplicateTarget { group: String, id: u32 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NamedTarget {
    pub fn new(group: &str, id: u32, blue_pose: Pose) -> Self {
        Self {
            group: group.to_string(),
            id,
            blue_pose,
        }
    }
}

impl AlliancePoseRegistry {
    /// Build the registry from a list of canonical (blue) targets.
    pub fn new(field: Field, targets: Vec<NamedTarget>) -> Result<Self, RegistryError> {
        // Each (group, id) pair may only be authored once
        {
            let mut seen = HashSet::new();
            for t in targets.iter() {
                if !seen.insert((t.group.as_str(), t.id)) {
                    return Err(RegistryError::DuplicateTarget {
                        group: t.group.clone(),
                        id: t.id,
                    });
                }
            }
        }

        let red_poses = targets
            .iter()
            .map(|t| field.mirror_pose(t.blue_pose))
            .collect();

        debug!("AlliancePoseRegistry built with {} targets", targets.len());

        Ok(Self {
            field,
            targets,
            red_poses,
        })
    }

    /// Build the registry from the field parameters, generating the reef branches if the reef
    /// geometry is given.
    pub fn from_params(params: &FieldParams) -> Result<Self, RegistryError> {
        let mut targets: Vec<NamedTarget> = params
            .targets
            .iter()
            .map(|t| NamedTarget::new(&t.group, t.id, t.pose()))
            .collect();

        if let Some(ref reef) = params.reef {
            targets.extend(reef::branch_targets(reef));
        }

        Self::new(params.field(), targets)
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn targets(&self) -> &[NamedTarget] {
        &self.targets
    }

    /// Get the pose of the target for the given alliance.
    pub fn get(&self, group: &str, id: u32, alliance: Alliance) -> Result<Pose, RegistryError> {
        let index = self
            .targets
            .iter()
            .position(|t| t.group == group && t.id == id)
            .ok_or_else(|| RegistryError::NotFound {
                group: group.to_string(),
                id,
            })?;

        Ok(self.pose_at(index, alliance))
    }

    /// Get the target in `group` whose alliance-adjusted pose is closest to `position`.
    ///
    /// Ties are broken by the lowest id.
    pub fn get_nearest(
        &self,
        position: &Position,
        alliance: Alliance,
        group: &str,
    ) -> Result<&NamedTarget, RegistryError> {
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.group == group)
            .min_by_key(|(i, t)| {
                let dist = self.pose_at(*i, alliance).position.distance_to(position);
                (OrderedFloat(dist), t.id)
            })
            .map(|(_, t)| t)
            .ok_or_else(|| RegistryError::GroupEmpty(group.to_string()))
    }

    /// Iterate over all targets in the given group.
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a NamedTarget> + 'a {
        self.targets.iter().filter(move |t| t.group == group)
    }

    fn pose_at(&self, index: usize, alliance: Alliance) -> Pose {
        match alliance {
            Alliance::Blue => self.targets[index].blue_pose,
            Alliance::Red => self.red_poses[index],
        }
    }
}
