//! Track path geometry
//!
//! A small, fixed set of curve shapes placed in a unit cell (corners at ±0.5),
//! each available in four quarter-turn rotations:
//! - `curve`: `Path` evaluation (point, tangent, closest point)
//! - `catalog`: Precomputed table of every (shape, rotation) pair

pub mod catalog;
pub mod curve;

pub use catalog::PathCatalog;
pub use curve::{ClosestPoint, Path, PathShape};
