//! Prebuilt paths for every shape at every quarter-turn rotation

use super::curve::{Path, PathShape};
use crate::normalize_rotation_quarters;

/// Immutable lookup of all `PathShape::COUNT * 4` paths
///
/// Built once and shared (typically behind an `Arc`) by every track grid.
#[derive(Debug, Clone)]
pub struct PathCatalog {
    paths: [[Path; 4]; PathShape::COUNT],
}

impl Default for PathCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCatalog {
    pub fn new() -> Self {
        let paths = std::array::from_fn(|shape_index| {
            let shape = PathShape::ALL[shape_index];
            std::array::from_fn(|rotation| Path::new(shape, rotation as i32))
        });
        log::debug!("Built path catalog ({} shapes x 4 rotations)", PathShape::COUNT);
        Self { paths }
    }

    /// Path for `shape` at any rotation (normalized before lookup)
    pub fn get(&self, shape: PathShape, rotation_quarters: i32) -> &Path {
        let rotation = normalize_rotation_quarters(rotation_quarters) as usize;
        &self.paths[shape as usize][rotation]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_catalog_covers_all_shapes_and_rotations() {
        let catalog = PathCatalog::new();
        for shape in PathShape::ALL {
            for rotation in 0..4 {
                let path = catalog.get(shape, rotation);
                assert_eq!(path.shape(), shape);
                assert_eq!(path.rotation_quarters(), rotation);
            }
        }
    }

    #[test]
    fn test_catalog_normalizes_rotation() {
        let catalog = PathCatalog::new();
        assert_eq!(
            catalog.get(PathShape::Curve, -1),
            catalog.get(PathShape::Curve, 3)
        );
        assert_eq!(
            catalog.get(PathShape::Straight, 9),
            catalog.get(PathShape::Straight, 1)
        );
    }

    #[test]
    fn test_catalog_matches_direct_construction() {
        let catalog = PathCatalog::default();
        let direct = Path::new(PathShape::JogRight, 2);
        let cached = catalog.get(PathShape::JogRight, 2);
        for i in 0..=4 {
            let t = i as f32 / 4.0;
            assert!(direct.point(t).distance(cached.point(t)) < 1e-6);
        }
        assert_eq!(cached.point(0.0), Vec2::new(0.5, -0.5));
    }
}
