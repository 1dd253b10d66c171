//! # Segment module
//!
//! A segment is a precomputed, alliance agnostic motion path, stored as an ordered sequence of
//! blue-frame poses. Segments are produced by an offline path planner and resolved here by their
//! identifier.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, fs, io, path::PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::field::{Angle, Pose};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Extension of segment files in the segment directory.
pub const SEGMENT_FILE_EXT: &str = "path";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A loaded motion segment.
///
/// A segment always contains at least one waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    id: String,
    poses: Vec<Pose>,
}

/// Loads segments from `<dir>/<id>.path` JSON files.
#[derive(Debug, Clone)]
pub struct FileSegmentLoader {
    dir: PathBuf,
}

/// Serves segments from memory.
#[derive(Debug, Clone, Default)]
pub struct MemSegmentLoader {
    segments: HashMap<String, Vec<Pose>>,
}

/// On-disk format of a segment file.
#[derive(Debug, Deserialize, Serialize)]
struct SegmentFile {
    waypoints: Vec<WaypointFile>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WaypointFile {
    x_m: f64,
    y_m: f64,
    heading_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SegmentLoadError {
    #[error("Segment {id:?} not found at {path:?}")]
    NotFound { id: String, path: PathBuf },

    #[error("Segment {id:?} is not available")]
    Unavailable { id: String },

    #[error("Segment id {id:?} is not a valid segment name")]
    InvalidId { id: String },

    #[error("Cannot read segment {id:?}: {cause}")]
    Io {
        id: String,
        #[source]
        cause: io::Error,
    },

    #[error("Segment {id:?} is malformed: {cause}")]
    Malformed {
        id: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Segment {id:?} contains no waypoints")]
    Empty { id: String },
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Resolves segment identifiers to segment data.
///
/// Repeated loads of the same id must return structurally identical segments.
pub trait SegmentLoader {
    fn load(&self, id: &str) -> Result<Segment, SegmentLoadError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Segment {
    /// Create a new segment, failing if `poses` is empty.
    pub fn new(id: &str, poses: Vec<Pose>) -> Result<Self, SegmentLoadError> {
        if poses.is_empty() {
            return Err(SegmentLoadError::Empty { id: id.to_string() });
        }

        Ok(Self {
            id: id.to_string(),
            poses,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn waypoint_count(&self) -> usize {
        self.poses.len()
    }

    pub fn first_pose(&self) -> Pose {
        // Never empty, see `Segment::new`
        self.poses[0]
    }

    pub fn last_pose(&self) -> Pose {
        self.poses[self.poses.len() - 1]
    }

    /// Length of the segment in meters, measured along straight lines between waypoints.
    pub fn length_m(&self) -> f64 {
        self.poses
            .windows(2)
            .map(|w| w[0].position.distance_to(&w[1].position))
            .sum()
    }
}

impl SegmentLoadError {
    /// The id of the segment which failed to load.
    pub fn id(&self) -> &str {
        match self {
            SegmentLoadError::NotFound { id, .. }
            | SegmentLoadError::Unavailable { id }
            | SegmentLoadError::InvalidId { id }
            | SegmentLoadError::Io { id, .. }
            | SegmentLoadError::Malformed { id, .. }
            | SegmentLoadError::Empty { id } => id,
        }
    }
}

impl FileSegmentLoader {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn segment_path(&self, id: &str) -> Result<PathBuf, SegmentLoadError> {
        // Ids are plain names, they must not be able to escape the segment directory
        if id.is_empty() || id.contains(|c: char| c == '/' || c == '\\') || id.starts_with('.') {
            return Err(SegmentLoadError::InvalidId { id: id.to_string() });
        }

        let mut path = self.dir.clone();
        path.push(format!("{}.{}", id, SEGMENT_FILE_EXT));
        Ok(path)
    }
}

impl SegmentLoader for FileSegmentLoader {
    fn load(&self, id: &str) -> Result<Segment, SegmentLoadError> {
        let path = self.segment_path(id)?;

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Segment file {:?} does not exist", path);
                return Err(SegmentLoadError::NotFound {
                    id: id.to_string(),
                    path,
                });
            }
            Err(e) => {
                return Err(SegmentLoadError::Io {
                    id: id.to_string(),
                    cause: e,
                })
            }
        };

        let file: SegmentFile =
            serde_json::from_str(&contents).map_err(|e| SegmentLoadError::Malformed {
                id: id.to_string(),
                cause: e,
            })?;

        let poses = file
            .waypoints
            .iter()
            .map(|w| Pose::new(w.x_m, w.y_m, Angle::from_deg(w.heading_deg)))
            .collect();

        let segment = Segment::new(id, poses)?;

        debug!(
            "Loaded segment {:?} ({} waypoints) from {:?}",
            id,
            segment.waypoint_count(),
            path
        );

        Ok(segment)
    }
}

impl MemSegmentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the segment with the given id.
    pub fn insert(&mut self, id: &str, poses: Vec<Pose>) {
        self.segments.insert(id.to_string(), poses);
    }

    pub fn with(mut self, id: &str, poses: Vec<Pose>) -> Self {
        self.insert(id, poses);
        self
    }
}

impl SegmentLoader for MemSegmentLoader {
    fn load(&self, id: &str) -> Result<Segment, SegmentLoadError> {
        match self.segments.get(id) {
            Some(poses) => Segment::new(id, poses.clone()),
            None => Err(SegmentLoadError::Unavailable { id: id.to_string() }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("auton_segment_test_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_file_loader() {
        let dir = tmp_dir("ok");
        fs::write(
            dir.join("Path1.path"),
            r#"{"waypoints": [
                {"x_m": 7.2, "y_m": 6.0, "heading_deg": 180.0},
                {"x_m": 6.0, "y_m": 6.2, "heading_deg": 170.0},
                {"x_m": 5.1, "y_m": 5.5, "heading_deg": -120.0}
            ]}"#,
        )
        .unwrap();

        let loader = FileSegmentLoader::new(&dir);
        let seg = loader.load("Path1").unwrap();

        assert_eq!(seg.id(), "Path1");
        assert_eq!(seg.waypoint_count(), 3);
        assert_eq!(seg.first_pose().position.x_m, 7.2);
        assert!(seg.last_pose().heading.approx_eq(&Angle::from_deg(-120.0), 1e-12));

        // Repeated loads are structurally identical
        assert_eq!(loader.load("Path1").unwrap(), seg);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_file_loader_errors() {
        let dir = tmp_dir("err");
        fs::write(dir.join("Empty.path"), r#"{"waypoints": []}"#).unwrap();
        fs::write(dir.join("Bad.path"), r#"{"waypoints": [{"x_m": 1.0}]}"#).unwrap();

        let loader = FileSegmentLoader::new(&dir);

        assert!(matches!(
            loader.load("Missing"),
            Err(SegmentLoadError::NotFound { .. })
        ));
        assert!(matches!(
            loader.load("Empty"),
            Err(SegmentLoadError::Empty { .. })
        ));
        assert!(matches!(
            loader.load("Bad"),
            Err(SegmentLoadError::Malformed { .. })
        ));
        assert!(matches!(
            loader.load("../Bad"),
            Err(SegmentLoadError::InvalidId { .. })
        ));
        assert_eq!(loader.load("Bad").unwrap_err().id(), "Bad");

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_mem_loader() {
        let loader = MemSegmentLoader::new()
            .with(
                "A",
                vec![
                    Pose::new(0.0, 0.0, Angle::default()),
                    Pose::new(3.0, 4.0, Angle::default()),
                ],
            )
            .with("Nothing", vec![]);

        let a = loader.load("A").unwrap();
        assert_eq!(a.length_m(), 5.0);
        assert!(matches!(
            loader.load("B"),
            Err(SegmentLoadError::Unavailable { .. })
        ));
        assert!(matches!(
            loader.load("Nothing"),
            Err(SegmentLoadError::Empty { .. })
        ));
    }
}
