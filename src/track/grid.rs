//! Track grid: segments placed on the sparse sector grid
//!
//! The grid owns every segment in an id-keyed arena; cells hold only ids.
//! World coordinates put the centre of cell (x, y) at `(x, y) * segment_size`,
//! so path corners sit on half-integer multiples of the segment size.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use glam::Vec2;

use super::segment::{Segment, SegmentId, SwitchPathIds};
use crate::consts::{ADJACENT_MAX, DEFAULT_SECTOR_SIZE, GRID_EPSILON, TANGENT_EPSILON};
use crate::grid::SectorGrid;
use crate::normalize_angle;
use crate::path::{Path, PathCatalog};
use crate::settings::TrackSettings;

/// Nearest point on any track near a query location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnTrackPoint {
    pub point: Vec2,
    pub distance: f32,
    /// Direction of increasing progress, radians
    pub tangent: f32,
    pub segment: SegmentId,
    pub path_id: usize,
    pub progress: f32,
}

/// Path endpoint reached by following track out of another endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub segment: SegmentId,
    pub path_id: usize,
    /// 0.0 or 1.0: the end of the path that touches the departure point
    pub progress: f32,
}

#[derive(Debug, Clone)]
struct PlacedSegment {
    segment: Segment,
    cell: (i32, i32),
}

/// Segments on an unbounded grid with world-space geometry queries
#[derive(Debug, Clone)]
pub struct TrackGrid {
    segment_size: f32,
    catalog: Arc<PathCatalog>,
    cells: SectorGrid<Option<SegmentId>>,
    segments: BTreeMap<SegmentId, PlacedSegment>,
    next_segment_id: u32,
}

impl TrackGrid {
    pub fn new(segment_size: f32, catalog: Arc<PathCatalog>) -> Self {
        Self::with_sector_size(segment_size, DEFAULT_SECTOR_SIZE, catalog)
    }

    pub fn with_sector_size(segment_size: f32, sector_size: usize, catalog: Arc<PathCatalog>) -> Self {
        assert!(segment_size > 0.0, "segment size must be positive");
        Self {
            segment_size,
            catalog,
            cells: SectorGrid::new(sector_size, None),
            segments: BTreeMap::new(),
            next_segment_id: 1,
        }
    }

    /// Empty grid sized by `settings`
    pub fn from_settings(settings: &TrackSettings, catalog: Arc<PathCatalog>) -> Self {
        Self::with_sector_size(settings.segment_size, settings.sector_size, catalog)
    }

    #[inline]
    pub fn segment_size(&self) -> f32 {
        self.segment_size
    }

    #[inline]
    pub fn catalog(&self) -> &Arc<PathCatalog> {
        &self.catalog
    }

    // === Coordinate conversion ===

    /// World point to the cell whose centre is nearest
    pub fn world_to_grid(world: Vec2, segment_size: f32) -> (i32, i32) {
        let scaled = world / segment_size + Vec2::splat(0.5);
        (scaled.x.floor() as i32, scaled.y.floor() as i32)
    }

    /// Centre of a cell in world coordinates
    pub fn grid_to_world(x: i32, y: i32, segment_size: f32) -> Vec2 {
        Vec2::new(x as f32, y as f32) * segment_size
    }

    #[inline]
    pub fn to_grid(&self, world: Vec2) -> (i32, i32) {
        Self::world_to_grid(world, self.segment_size)
    }

    #[inline]
    pub fn to_world(&self, x: i32, y: i32) -> Vec2 {
        Self::grid_to_world(x, y, self.segment_size)
    }

    // === Cells and the segment arena ===

    /// Segment id at a cell, if occupied
    pub fn get(&self, x: i32, y: i32) -> Option<SegmentId> {
        *self.cells.get(x, y)
    }

    /// Place a segment, replacing (and dropping) whatever occupied the cell
    pub fn set(&mut self, x: i32, y: i32, segment: Segment) -> SegmentId {
        if let Some(old) = self.get(x, y) {
            self.segments.remove(&old);
            log::debug!("Replaced segment {old} at ({x}, {y})");
        }
        let id = SegmentId(self.next_segment_id);
        self.next_segment_id += 1;
        log::debug!("Placed {:?} {id} at ({x}, {y})", segment.segment_type);
        self.segments.insert(id, PlacedSegment { segment, cell: (x, y) });
        self.cells.set(x, y, Some(id));
        id
    }

    /// Remove the segment at a cell, pruning its sector if that empties it
    pub fn erase(&mut self, x: i32, y: i32) -> Option<Segment> {
        let id = self.get(x, y)?;
        self.cells.erase(x, y, true);
        log::debug!("Erased segment {id} at ({x}, {y})");
        self.segments.remove(&id).map(|placed| placed.segment)
    }

    pub fn get_at(&self, world: Vec2) -> Option<SegmentId> {
        let (x, y) = self.to_grid(world);
        self.get(x, y)
    }

    pub fn set_at(&mut self, world: Vec2, segment: Segment) -> SegmentId {
        let (x, y) = self.to_grid(world);
        self.set(x, y, segment)
    }

    pub fn erase_at(&mut self, world: Vec2) -> Option<Segment> {
        let (x, y) = self.to_grid(world);
        self.erase(x, y)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id).map(|placed| &placed.segment)
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.get_mut(&id).map(|placed| &mut placed.segment)
    }

    /// Cell currently holding a segment
    pub fn cell_of(&self, id: SegmentId) -> Option<(i32, i32)> {
        self.segments.get(&id).map(|placed| placed.cell)
    }

    /// Segment at a cell, resolved
    pub fn segment_at(&self, x: i32, y: i32) -> Option<(SegmentId, &Segment)> {
        let id = self.get(x, y)?;
        self.segment(id).map(|segment| (id, segment))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Occupied cells in grid storage order
    pub fn iter(&self) -> impl Iterator<Item = ((i32, i32), SegmentId)> + '_ {
        self.cells.iter().filter_map(|(cell, id)| id.map(|id| (cell, id)))
    }

    /// Segments in id (placement) order
    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> + '_ {
        self.segments.iter().map(|(&id, placed)| (id, &placed.segment))
    }

    // === Segment geometry in world space ===

    fn placed_path(&self, id: SegmentId, path_id: usize) -> Option<(&Path, Vec2)> {
        let placed = self.segments.get(&id)?;
        let path = placed.segment.path(&self.catalog, path_id)?;
        Some((path, self.to_world(placed.cell.0, placed.cell.1)))
    }

    pub fn path_point(&self, id: SegmentId, path_id: usize, progress: f32) -> Option<Vec2> {
        let (path, center) = self.placed_path(id, path_id)?;
        Some(center + path.point(progress) * self.segment_size)
    }

    /// Heading along a path at `progress`, radians
    pub fn path_rotation(&self, id: SegmentId, path_id: usize, progress: f32) -> Option<f32> {
        let (path, _) = self.placed_path(id, path_id)?;
        Some(path.tangent(progress))
    }

    /// Path length in world units
    pub fn path_length(&self, id: SegmentId, path_id: usize) -> Option<f32> {
        let (path, _) = self.placed_path(id, path_id)?;
        Some(path.length() * self.segment_size)
    }

    // === Spatial queries ===

    /// Segments sharing the corner, edge or interior nearest `world`
    ///
    /// A corner yields up to four cells, an edge up to two, an interior
    /// point one. Empty cells are skipped.
    pub fn find_adjacent_segments(&self, world: Vec2) -> Vec<SegmentId> {
        let (x, y) = self.to_grid(world);
        let local = world / self.segment_size - Vec2::new(x as f32, y as f32);

        let span = |offset: f32, cell: i32| -> (i32, i32) {
            if (offset + 0.5).abs() < GRID_EPSILON {
                (cell - 1, 2)
            } else if (offset - 0.5).abs() < GRID_EPSILON {
                (cell, 2)
            } else {
                (cell, 1)
            }
        };
        let (x0, width) = span(local.x, x);
        let (y0, height) = span(local.y, y);

        let mut adjacent = Vec::with_capacity(ADJACENT_MAX);
        for cy in y0..y0 + height {
            for cx in x0..x0 + width {
                if let Some(id) = self.get(cx, cy) {
                    adjacent.push(id);
                }
            }
        }
        adjacent
    }

    /// Closest point on any path within `search_radius` cells of `world`
    pub fn find_closest_on_track_point(
        &self,
        world: Vec2,
        search_radius: i32,
        progress_precision: f32,
    ) -> Option<OnTrackPoint> {
        let (gx, gy) = self.to_grid(world);
        let mut best: Option<OnTrackPoint> = None;

        for y in gy - search_radius..=gy + search_radius {
            for x in gx - search_radius..=gx + search_radius {
                let Some((id, segment)) = self.segment_at(x, y) else {
                    continue;
                };
                let center = self.to_world(x, y);
                let local_target = (world - center) / self.segment_size;

                for path_id in 0..segment.path_count() {
                    let Some(path) = segment.path(&self.catalog, path_id) else {
                        continue;
                    };
                    let closest = path.closest_point(local_target, progress_precision);
                    let distance = closest.distance * self.segment_size;
                    if best.is_some_and(|b| b.distance <= distance) {
                        continue;
                    }
                    best = Some(OnTrackPoint {
                        point: center + closest.point * self.segment_size,
                        distance,
                        tangent: path.tangent(closest.progress),
                        segment: id,
                        path_id,
                        progress: closest.progress,
                    });
                }
            }
        }
        best
    }

    /// [`Self::find_closest_on_track_point`] with radius and precision from `settings`
    pub fn closest_on_track(&self, world: Vec2, settings: &TrackSettings) -> Option<OnTrackPoint> {
        self.find_closest_on_track_point(world, settings.search_radius, settings.progress_precision)
    }

    /// Every path end that continues the track out of `(from, path_id)` at `progress`
    ///
    /// Grouped by segment in adjacency order.
    fn connections_from(&self, from: SegmentId, path_id: usize, progress: f32) -> Vec<Connection> {
        assert!(
            progress == 0.0 || progress == 1.0,
            "connections exist only at path ends, got progress {progress}"
        );
        let mut connections = Vec::new();
        let Some(endpoint) = self.path_point(from, path_id, progress) else {
            return connections;
        };
        let Some(tangent) = self.path_rotation(from, path_id, progress) else {
            return connections;
        };
        let heading = if progress == 1.0 {
            normalize_angle(tangent)
        } else {
            normalize_angle(tangent + std::f32::consts::PI)
        };
        let forward = Vec2::from_angle(heading);
        let tolerance = GRID_EPSILON * self.segment_size;

        for candidate in self.find_adjacent_segments(endpoint) {
            if candidate == from {
                continue;
            }
            let Some(placed) = self.segments.get(&candidate) else {
                continue;
            };
            let center = self.to_world(placed.cell.0, placed.cell.1);
            if (center - endpoint).dot(forward) <= 0.0 {
                continue;
            }
            for candidate_path in 0..placed.segment.path_count() {
                let Some(path) = placed.segment.path(&self.catalog, candidate_path) else {
                    continue;
                };
                for end in [0.0, 1.0] {
                    let point = center + path.point(end) * self.segment_size;
                    if point.distance(endpoint) >= tolerance {
                        continue;
                    }
                    let leaving = if end == 0.0 {
                        path.tangent(end)
                    } else {
                        path.tangent(end) + std::f32::consts::PI
                    };
                    if normalize_angle(leaving - heading).abs() < TANGENT_EPSILON {
                        connections.push(Connection {
                            segment: candidate,
                            path_id: candidate_path,
                            progress: end,
                        });
                    }
                }
            }
        }
        connections
    }

    /// Follow track out of the `progress` end (0 or 1) of a path
    ///
    /// When the neighbouring segment offers several matching paths, its switch
    /// decides; `switch_overrides` takes precedence over the segment's own
    /// switch. Panics if `progress` is not an endpoint.
    pub fn find_connecting_path(
        &self,
        from: SegmentId,
        path_id: usize,
        progress: f32,
        switch_overrides: Option<&SwitchPathIds>,
    ) -> Option<Connection> {
        let connections = self.connections_from(from, path_id, progress);
        let first = *connections.first()?;
        let matches: Vec<Connection> = connections
            .into_iter()
            .filter(|c| c.segment == first.segment)
            .collect();
        if matches.len() == 1 {
            return Some(first);
        }

        let switch = switch_overrides
            .and_then(|overrides| overrides.get(&first.segment).copied())
            .or_else(|| self.segment(first.segment).and_then(Segment::switch_path_id));
        let chosen = switch.and_then(|switch| matches.iter().find(|c| c.path_id == switch));
        Some(*chosen.unwrap_or(&first))
    }

    /// All segments reachable from `start` along track, ignoring switches
    ///
    /// Includes `start` itself, in breadth-first order.
    pub fn get_all_connected(&self, start: SegmentId) -> Vec<SegmentId> {
        let mut connected = Vec::new();
        if !self.segments.contains_key(&start) {
            return connected;
        }
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            connected.push(id);
            let path_count = self.segment(id).map_or(0, Segment::path_count);
            for path_id in 0..path_count {
                for end in [0.0, 1.0] {
                    for connection in self.connections_from(id, path_id, end) {
                        if seen.insert(connection.segment) {
                            queue.push_back(connection.segment);
                        }
                    }
                }
            }
        }
        connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::SegmentType;

    fn grid() -> TrackGrid {
        TrackGrid::with_sector_size(10.0, 4, Arc::new(PathCatalog::new()))
    }

    fn seg(segment_type: SegmentType, rotation: i32) -> Segment {
        Segment::new(segment_type).with_rotation(rotation)
    }

    #[test]
    fn test_conversions_round_to_nearest() {
        assert_eq!(TrackGrid::world_to_grid(Vec2::new(4.9, -4.9), 10.0), (0, 0));
        assert_eq!(TrackGrid::world_to_grid(Vec2::new(5.0, -5.1), 10.0), (1, -1));
        assert_eq!(TrackGrid::world_to_grid(Vec2::new(-15.0, 24.0), 10.0), (-1, 2));
        assert_eq!(TrackGrid::grid_to_world(-3, 2, 10.0), Vec2::new(-30.0, 20.0));

        let grid = grid();
        for (x, y) in [(0, 0), (-7, 3), (12, -40)] {
            assert_eq!(grid.to_grid(grid.to_world(x, y)), (x, y));
        }
    }

    #[test]
    fn test_set_replace_erase() {
        let mut grid = grid();
        let a = grid.set(2, -3, seg(SegmentType::Straight, 0));
        assert_eq!(grid.get(2, -3), Some(a));
        assert_eq!(grid.cell_of(a), Some((2, -3)));

        let b = grid.set(2, -3, seg(SegmentType::Curve, 1));
        assert_ne!(a, b);
        assert!(grid.segment(a).is_none());
        assert_eq!(grid.len(), 1);

        let erased = grid.erase(2, -3).unwrap();
        assert_eq!(erased.segment_type, SegmentType::Curve);
        assert!(grid.is_empty());
        assert!(grid.segment(b).is_none());
        assert!(grid.erase(2, -3).is_none());
        assert_eq!(grid.iter().count(), 0);
    }

    #[test]
    fn test_world_location_forms() {
        let mut grid = grid();
        let id = grid.set_at(Vec2::new(21.0, 9.0), seg(SegmentType::Straight, 0));
        assert_eq!(grid.get(2, 1), Some(id));
        assert_eq!(grid.get_at(Vec2::new(24.0, 14.0)), Some(id));
        assert!(grid.erase_at(Vec2::new(16.0, 6.0)).is_some());
        assert!(grid.get(2, 1).is_none());
    }

    #[test]
    fn test_adjacent_segments() {
        let mut grid = grid();
        let mut ids = Vec::new();
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1), (3, 3)] {
            ids.push(grid.set(x, y, seg(SegmentType::Straight, 0)));
        }

        // Corner shared by the 2x2 block
        let corner = grid.find_adjacent_segments(Vec2::new(5.0, 5.0));
        assert_eq!(corner.len(), 4);
        for id in &ids[..4] {
            assert!(corner.contains(id));
        }

        // Edge between (0, 0) and (1, 0)
        let edge = grid.find_adjacent_segments(Vec2::new(5.0, 1.0));
        assert_eq!(edge.len(), 2);
        assert!(edge.contains(&ids[0]) && edge.contains(&ids[1]));

        // Interior
        assert_eq!(grid.find_adjacent_segments(Vec2::new(31.0, 29.0)), vec![ids[4]]);
        assert!(grid.find_adjacent_segments(Vec2::new(-20.0, 0.0)).is_empty());
    }

    #[test]
    fn test_path_geometry_world_space() {
        let mut grid = grid();
        let id = grid.set(1, 0, seg(SegmentType::Straight, 1));
        assert_eq!(grid.path_point(id, 0, 0.0), Some(Vec2::new(15.0, -5.0)));
        assert_eq!(grid.path_point(id, 0, 1.0), Some(Vec2::new(15.0, 5.0)));
        let rotation = grid.path_rotation(id, 0, 0.5).unwrap();
        assert!((rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(grid.path_length(id, 0), Some(10.0));
        assert!(grid.path_point(id, 1, 0.0).is_none());
    }

    #[test]
    fn test_connecting_straights() {
        let mut grid = grid();
        let a = grid.set(0, 0, seg(SegmentType::Straight, 0));
        let b = grid.set(1, 0, seg(SegmentType::Straight, 0));

        let forward = grid.find_connecting_path(a, 0, 1.0, None).unwrap();
        assert_eq!(forward, Connection { segment: b, path_id: 0, progress: 0.0 });

        let back = grid.find_connecting_path(b, 0, 0.0, None).unwrap();
        assert_eq!(back, Connection { segment: a, path_id: 0, progress: 1.0 });

        assert!(grid.find_connecting_path(a, 0, 0.0, None).is_none());
        assert!(grid.find_connecting_path(b, 0, 1.0, None).is_none());
    }

    #[test]
    fn test_connection_reversed_neighbour() {
        let mut grid = grid();
        let a = grid.set(0, 0, seg(SegmentType::Straight, 0));
        // Half a turn puts the path on the top edge, running right to left
        let c = grid.set(1, -1, seg(SegmentType::Straight, 2));
        let connection = grid.find_connecting_path(a, 0, 1.0, None).unwrap();
        assert_eq!(connection.segment, c);
        assert_eq!(connection.progress, 1.0);
    }

    #[test]
    fn test_switch_selects_and_override_wins() {
        let mut grid = grid();
        let a = grid.set(0, 0, seg(SegmentType::Straight, 0));
        let join = grid.set(1, 0, seg(SegmentType::JoinLeft, 0));

        let taken = grid.find_connecting_path(a, 0, 1.0, None).unwrap();
        assert_eq!((taken.segment, taken.path_id), (join, 0));

        grid.segment_mut(join).unwrap().set_switch_path_id(1);
        let taken = grid.find_connecting_path(a, 0, 1.0, None).unwrap();
        assert_eq!(taken.path_id, 1);

        let overrides = SwitchPathIds::from([(join, 0)]);
        let taken = grid.find_connecting_path(a, 0, 1.0, Some(&overrides)).unwrap();
        assert_eq!(taken.path_id, 0);
        assert_eq!(grid.segment(join).unwrap().switch_path_id(), Some(1));
    }

    #[test]
    #[should_panic]
    fn test_connection_from_interior_panics() {
        let mut grid = grid();
        let a = grid.set(0, 0, seg(SegmentType::Straight, 0));
        grid.find_connecting_path(a, 0, 0.5, None);
    }

    #[test]
    fn test_stale_id_is_not_found() {
        let mut grid = grid();
        let a = grid.set(0, 0, seg(SegmentType::Straight, 0));
        grid.set(1, 0, seg(SegmentType::Straight, 0));
        grid.erase(0, 0);
        assert!(grid.find_connecting_path(a, 0, 1.0, None).is_none());
        assert!(grid.get_all_connected(a).is_empty());
        assert!(grid.path_point(a, 0, 0.0).is_none());
    }

    #[test]
    fn test_closest_on_track_point() {
        let mut grid = grid();
        let id = grid.set(0, 0, seg(SegmentType::Straight, 0));
        grid.set(5, 5, seg(SegmentType::Straight, 0));

        let closest = grid
            .find_closest_on_track_point(Vec2::new(1.0, -3.0), 1, 0.01)
            .unwrap();
        assert_eq!(closest.segment, id);
        assert_eq!(closest.path_id, 0);
        assert!((closest.progress - 0.6).abs() < 0.011);
        assert!((closest.distance - 2.0).abs() < 0.05);
        assert!(closest.point.distance(Vec2::new(1.0, -5.0)) < 0.11);
        assert!(closest.tangent.abs() < 1e-6);

        assert!(grid.find_closest_on_track_point(Vec2::new(-40.0, 0.0), 1, 0.01).is_none());
    }

    #[test]
    fn test_closest_with_settings() {
        let settings = TrackSettings {
            segment_size: 10.0,
            search_radius: 2,
            ..TrackSettings::default()
        };
        let mut grid = TrackGrid::from_settings(&settings, Arc::new(PathCatalog::new()));
        let id = grid.set(2, 0, seg(SegmentType::Straight, 0));

        // Two cells away: found with radius 2, missed with radius 1
        let closest = grid.closest_on_track(Vec2::new(0.0, -5.0), &settings).unwrap();
        assert_eq!(closest.segment, id);
        assert_eq!(closest.progress, 0.0);
        assert!(grid.find_closest_on_track_point(Vec2::new(0.0, -5.0), 1, 0.01).is_none());
    }

    #[test]
    fn test_all_connected_terminates_on_loop() {
        let mut grid = grid();
        // Four curves closing a ring around the corner at (5, 5)
        let ring = [
            grid.set(1, 0, seg(SegmentType::Curve, 0)),
            grid.set(1, 1, seg(SegmentType::Curve, 1)),
            grid.set(0, 1, seg(SegmentType::Curve, 2)),
            grid.set(0, 0, seg(SegmentType::Curve, 3)),
        ];
        grid.set(8, 8, seg(SegmentType::Straight, 0));

        let connected = grid.get_all_connected(ring[0]);
        assert_eq!(connected.len(), 4);
        assert_eq!(connected[0], ring[0]);
        for id in ring {
            assert!(connected.contains(&id));
        }
    }
}
