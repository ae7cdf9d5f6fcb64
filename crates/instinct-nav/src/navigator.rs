use instinct_core::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PathStatus {
    /// The path ends at the requested goal.
    Complete,
    /// The goal is unreachable; the path ends as close to it as the backend got.
    Partial,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavPath {
    pub points: Vec<Vec3>,
    pub status: PathStatus,
}

impl NavPath {
    pub fn new(points: Vec<Vec3>, status: PathStatus) -> Self {
        Self { points, status }
    }

    pub fn complete(points: Vec<Vec3>) -> Self {
        Self::new(points, PathStatus::Complete)
    }

    pub fn partial(points: Vec<Vec3>) -> Self {
        Self::new(points, PathStatus::Partial)
    }

    pub fn is_complete(&self) -> bool {
        self.status == PathStatus::Complete
    }

    /// Sum of corner-to-corner distances. Zero for fewer than two corners.
    pub fn length(&self) -> f32 {
        crate::estimate_path_length(&self.points)
    }

    pub fn end(&self) -> Option<Vec3> {
        self.points.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavRaycastHit {
    pub point: Vec3,
    /// Distance from the ray start to `point`.
    pub distance: f32,
}

/// Walkable-surface queries supplied by the host (or a reference backend).
pub trait Navigator {
    /// Nearest walkable point within `radius` of `point`.
    fn sample_position(&self, point: Vec3, radius: f32) -> Option<Vec3>;

    /// Path from `start` to `goal`. `None` when no path can even be started.
    fn find_path(&self, start: Vec3, goal: Vec3) -> Option<NavPath>;

    /// Raycast inside the nav representation.
    ///
    /// Returns the first point where the segment from `start` to `end` leaves walkable
    /// space. Backends that don't support raycasts may return `None`.
    fn raycast(&self, _start: Vec3, _end: Vec3) -> Option<NavRaycastHit> {
        None
    }
}
