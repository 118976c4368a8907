//! Flippy track core - spatial track model for a railway logic puzzle
//!
//! Core modules:
//! - `grid`: Sparse, sector-allocated infinite integer grid
//! - `path`: Fixed catalog of parametric track curves
//! - `track`: Segments on a grid, links between switches, truth-table simulation
//! - `settings`: Tunable track constants
//! - `persistence`: Logical snapshot of a track (grid + links)

pub mod grid;
pub mod path;
pub mod persistence;
pub mod settings;
pub mod track;

pub use grid::SectorGrid;
pub use path::{Path, PathCatalog, PathShape};
pub use persistence::TrackSnapshot;
pub use settings::TrackSettings;
pub use track::{
    LinkTable, Segment, SegmentId, SegmentType, TrackGrid, TrackTruthTable, TruthTable,
    TruthTableState, generate_truth_table,
};

use glam::Vec2;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Track configuration constants
pub mod consts {
    /// Default world units per grid cell edge
    pub const DEFAULT_SEGMENT_SIZE: f32 = 54.0;
    /// Default sector edge length (cells) for the sparse grid
    pub const DEFAULT_SECTOR_SIZE: usize = 32;
    /// Binary inputs/outputs
    pub const DEFAULT_VALUE_CARDINALITY: usize = 2;

    /// Most paths any segment type carries
    pub const MAX_PATHS_PER_SEGMENT: usize = 2;
    /// Most segments that can share a corner
    pub const ADJACENT_MAX: usize = 4;

    /// Tolerance (in cell units) for "on a corner / on an edge" tests
    pub const GRID_EPSILON: f32 = 0.01;
    /// Tolerance (in radians) when matching tangents of connecting paths
    pub const TANGENT_EPSILON: f32 = 0.01;
}

/// Normalize a rotation in quarter turns to [0, 3]
#[inline]
pub fn normalize_rotation_quarters(rotation_quarters: i32) -> i32 {
    rotation_quarters.rem_euclid(4)
}

/// Normalized angle to (-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut angle = angle.rem_euclid(TAU);
    if angle > PI {
        angle -= TAU;
    }
    angle
}

/// Rotate a point counter-clockwise about the origin by whole quarter turns
///
/// Exact for any rotation (no trig), so corner points stay on the lattice.
#[inline]
pub fn rotate_quarters(point: Vec2, rotation_quarters: i32) -> Vec2 {
    match normalize_rotation_quarters(rotation_quarters) {
        0 => point,
        1 => Vec2::new(-point.y, point.x),
        2 => Vec2::new(-point.x, -point.y),
        _ => Vec2::new(point.y, -point.x),
    }
}

#[inline]
pub fn quarters_to_radians(rotation_quarters: i32) -> f32 {
    rotation_quarters as f32 * FRAC_PI_2
}

/// Convert radians to (unnormalized) quarter turns
///
/// The divisor is biased slightly below π/2 so that sums of repeated π/2 steps
/// still land on the intended quarter despite float drift.
#[inline]
pub fn radians_to_quarters(radians: f32) -> i32 {
    (radians / (FRAC_PI_2 - 0.0001)) as i32
}
