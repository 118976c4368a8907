//! Track walk and truth table generation
//!
//! For each start platform and each input permutation a train is walked from
//! the platform along connected paths until it runs out of track:
//! - Inputs set their value on linked switches before the walk
//! - Entering a switched join at its shared end follows the switch
//! - Entering from the other end throws the switch to the travelled path,
//!   which is how linked outputs pick up values
//! - A walk longer than the hop limit is reported as an infinite loop
//!
//! Simulation never mutates the grid; switch positions live in a what-if map.

use std::f32::consts::FRAC_PI_2;

use super::grid::{OnTrackPoint, TrackGrid};
use super::links::{LinkTable, set_switch_path_id_in};
use super::segment::{Segment, SegmentId, SwitchPathIds};
use super::truth::{TrackTruthTable, TruthTable, TruthTableState};
use crate::consts::MAX_PATHS_PER_SEGMENT;
use crate::normalize_angle;
use crate::settings::TrackSettings;

/// Position of a train: which path, and which end it entered from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackCursor {
    pub segment: SegmentId,
    pub path_id: usize,
    /// Progress of the end the train entered at (0.0 or 1.0)
    pub entered_at: f32,
}

impl TrackCursor {
    /// Cursor on a start platform's first path, heading away from its inner end
    pub fn at_start(segment: SegmentId) -> Self {
        Self {
            segment,
            path_id: 0,
            entered_at: 0.0,
        }
    }

    /// Cursor on the path under a track point, for a train heading `heading` radians
    ///
    /// A heading within a quarter turn of the path tangent travels towards
    /// progress 1; any other heading travels towards progress 0.
    pub fn from_on_track_point(point: &OnTrackPoint, heading: f32) -> Self {
        let forward = normalize_angle(heading - point.tangent).abs() <= FRAC_PI_2;
        Self {
            segment: point.segment,
            path_id: point.path_id,
            entered_at: if forward { 0.0 } else { 1.0 },
        }
    }

    /// Progress of the end the train will leave by
    pub fn exit_progress(&self) -> f32 {
        1.0 - self.entered_at
    }
}

/// How a single walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Ran off the end of the track after this many hops
    Stopped { hops: usize },
    LoopDetected,
}

/// Hop limit for one walk on a track of `segment_count` segments
pub fn hop_limit(segment_count: usize, loop_bound_factor: usize) -> usize {
    loop_bound_factor.max(1) * segment_count.max(1) * MAX_PATHS_PER_SEGMENT * 2
}

/// Walk a train from the start platform `start`, updating `switches` as it trails through joins
pub fn walk<C>(
    grid: &TrackGrid,
    links: &LinkTable<C>,
    start: SegmentId,
    switches: &mut SwitchPathIds,
    hop_limit: usize,
) -> WalkOutcome {
    walk_from(grid, links, TrackCursor::at_start(start), switches, hop_limit)
}

/// Walk a train onward from `cursor`
pub fn walk_from<C>(
    grid: &TrackGrid,
    links: &LinkTable<C>,
    mut cursor: TrackCursor,
    switches: &mut SwitchPathIds,
    hop_limit: usize,
) -> WalkOutcome {
    let mut hops = 0;

    loop {
        let Some(next) = grid.find_connecting_path(
            cursor.segment,
            cursor.path_id,
            cursor.exit_progress(),
            Some(&*switches),
        ) else {
            return WalkOutcome::Stopped { hops };
        };
        hops += 1;
        if hops > hop_limit {
            return WalkOutcome::LoopDetected;
        }

        let trailing = grid
            .segment(next.segment)
            .and_then(|segment| segment.segment_type.shared_switch_progress())
            .is_some_and(|shared| shared != next.progress);
        if trailing {
            set_switch_path_id_in(links, next.segment, next.path_id, switches);
        }

        cursor = TrackCursor {
            segment: next.segment,
            path_id: next.path_id,
            entered_at: next.progress,
        };
    }
}

fn sort_segments(grid: &TrackGrid, ids: &mut [SegmentId]) {
    ids.sort_by_key(|&id| {
        let label = grid.segment(id).and_then(|segment| segment.label);
        (label.is_none(), label, id)
    });
}

/// Generate truth tables with default cardinality and loop bound
pub fn generate_truth_table<C>(
    grid: &TrackGrid,
    links: &LinkTable<C>,
    sort_by_label: bool,
) -> TrackTruthTable {
    let settings = TrackSettings {
        sort_by_label,
        ..TrackSettings::default()
    };
    generate_truth_table_with_settings(grid, links, &settings)
}

/// Generate one truth table per start platform
///
/// Each row starts from the grid's current switches with every output at 0,
/// applies the row's input values through links, then walks the train.
pub fn generate_truth_table_with_settings<C>(
    grid: &TrackGrid,
    links: &LinkTable<C>,
    settings: &TrackSettings,
) -> TrackTruthTable {
    let mut starts = Vec::new();
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (_, id) in grid.iter() {
        let Some(segment) = grid.segment(id) else {
            continue;
        };
        if segment.segment_type.is_platform_start() {
            starts.push(id);
        } else if segment.segment_type.is_input() {
            inputs.push(id);
        } else if segment.segment_type.is_output() {
            outputs.push(id);
        }
    }
    if settings.sort_by_label {
        sort_segments(grid, &mut starts);
        sort_segments(grid, &mut inputs);
        sort_segments(grid, &mut outputs);
    }

    if starts.is_empty() || inputs.is_empty() || outputs.is_empty() {
        log::warn!(
            "Cannot build truth table: {} starts, {} inputs, {} outputs",
            starts.len(),
            inputs.len(),
            outputs.len()
        );
        return TrackTruthTable {
            state: TruthTableState::MissingSegments,
            starts,
            inputs,
            outputs,
            truth_tables: Vec::new(),
        };
    }

    let base: SwitchPathIds = grid
        .segments()
        .filter_map(|(id, segment)| segment.switch_path_id().map(|value| (id, value)))
        .collect();
    let limit = hop_limit(grid.len(), settings.loop_bound_factor);
    let cardinality = settings.value_cardinality;
    let mut state = TruthTableState::Initialized;
    let mut truth_tables = Vec::with_capacity(starts.len());

    for &start in &starts {
        let mut table = TruthTable::new(inputs.len(), outputs.len(), cardinality);
        let mut input_values = TruthTable::input_values_first(inputs.len());
        loop {
            let mut switches = base.clone();
            for &output in &outputs {
                switches.insert(output, 0);
            }
            for (&input, &value) in inputs.iter().zip(&input_values) {
                set_switch_path_id_in(links, input, value, &mut switches);
            }

            if walk(grid, links, start, &mut switches, limit) == WalkOutcome::LoopDetected {
                log::warn!("Infinite loop from start {start} with inputs {input_values:?}");
                table.set_row_looped(&input_values, true);
                state = TruthTableState::InfiniteLoopDetected;
            }

            let row = table.output_values_mut(&input_values);
            for (slot, output) in row.iter_mut().zip(&outputs) {
                *slot = switches.get(output).copied().unwrap_or(0);
            }

            if !TruthTable::input_values_successor(&mut input_values, cardinality) {
                break;
            }
        }
        truth_tables.push(table);
    }

    log::info!(
        "Generated {} truth table(s): {} inputs, {} outputs, state {:?}",
        truth_tables.len(),
        inputs.len(),
        outputs.len(),
        state
    );
    TrackTruthTable {
        state,
        starts,
        inputs,
        outputs,
        truth_tables,
    }
}

/// Label of a segment for display, `?` when unlabelled
pub fn display_label(grid: &TrackGrid, id: SegmentId) -> char {
    grid.segment(id).and_then(|segment: &Segment| segment.label).unwrap_or('?')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCatalog;
    use crate::track::SegmentType;
    use glam::Vec2;
    use std::sync::Arc;

    fn seg(segment_type: SegmentType, rotation: i32) -> Segment {
        Segment::new(segment_type).with_rotation(rotation)
    }

    fn grid() -> TrackGrid {
        TrackGrid::new(10.0, Arc::new(PathCatalog::new()))
    }

    /// Input picks the branch; each branch trails through a join wired to the output
    fn pass_through_track() -> (TrackGrid, LinkTable, SegmentId, SegmentId) {
        let mut grid = grid();
        grid.set(0, 0, seg(SegmentType::PlatformStartLeft, 0));
        let split = grid.set(1, 0, seg(SegmentType::JoinLeft, 0));
        let low = grid.set(2, 0, seg(SegmentType::JoinRight, 2));
        let high = grid.set(1, 1, seg(SegmentType::JoinRight, 0));
        let input = grid.set(0, 5, Segment::new(SegmentType::ReadoutInput).with_label('a'));
        let output = grid.set(5, 5, Segment::new(SegmentType::ReadoutOutput).with_label('x'));

        let mut links = LinkTable::new();
        links.insert(input, split, ());
        links.insert(low, output, ());
        links.insert(high, output, ());
        (grid, links, input, output)
    }

    #[test]
    fn test_output_follows_input() {
        let (grid, links, input, output) = pass_through_track();
        let result = generate_truth_table(&grid, &links, true);

        assert_eq!(result.state, TruthTableState::Initialized);
        assert_eq!(result.inputs, vec![input]);
        assert_eq!(result.outputs, vec![output]);
        let table = result.first_truth_table().unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(table.output_values(&[0]), &[0]);
        assert_eq!(table.output_values(&[1]), &[1]);
        assert!(!table.row_looped(&[1]));
    }

    #[test]
    fn test_simulation_leaves_grid_untouched() {
        let (grid, links, _, output) = pass_through_track();
        let before: Vec<_> = grid.segments().map(|(id, s)| (id, s.switch_path_id())).collect();
        generate_truth_table(&grid, &links, false);
        let after: Vec<_> = grid.segments().map(|(id, s)| (id, s.switch_path_id())).collect();
        assert_eq!(before, after);
        assert_eq!(grid.segment(output).and_then(Segment::switch_path_id), Some(0));
    }

    #[test]
    fn test_walk_stops_at_dead_end() {
        let mut grid = grid();
        let start = grid.set(0, 0, seg(SegmentType::PlatformStartLeft, 0));
        grid.set(1, 0, seg(SegmentType::Straight, 0));
        grid.set(2, 0, seg(SegmentType::Straight, 0));
        let links: LinkTable = LinkTable::new();
        let mut switches = SwitchPathIds::new();
        assert_eq!(
            walk(&grid, &links, start, &mut switches, 100),
            WalkOutcome::Stopped { hops: 2 }
        );
    }

    #[test]
    fn test_closed_loop_detected() {
        let mut grid = grid();
        grid.set(0, 0, seg(SegmentType::PlatformStartLeft, 0));
        let merge = grid.set(1, 0, seg(SegmentType::JoinRight, 2));
        grid.set(2, 0, seg(SegmentType::Curve, 0));
        grid.set(2, 1, seg(SegmentType::Curve, 1));
        grid.set(1, 1, seg(SegmentType::Curve, 2));
        grid.set(10, 10, Segment::new(SegmentType::ReadoutInput));
        let output = grid.set(11, 10, Segment::new(SegmentType::ReadoutOutput));
        let mut links = LinkTable::new();
        links.insert(merge, output, ());

        let result = generate_truth_table(&grid, &links, false);
        assert_eq!(result.state, TruthTableState::InfiniteLoopDetected);
        let table = result.first_truth_table().unwrap();
        assert!(table.row_looped(&[0]));
        assert!(table.row_looped(&[1]));
    }

    #[test]
    fn test_missing_segments() {
        let mut grid = grid();
        grid.set(0, 0, seg(SegmentType::PlatformStartLeft, 0));
        grid.set(1, 0, Segment::new(SegmentType::ReadoutOutput));
        let links: LinkTable = LinkTable::new();

        let result = generate_truth_table(&grid, &links, true);
        assert_eq!(result.state, TruthTableState::MissingSegments);
        assert!(result.truth_tables.is_empty());
        assert_eq!(result.starts.len(), 1);
        assert!(result.inputs.is_empty());
    }

    #[test]
    fn test_sort_by_label_unlabelled_last() {
        let mut grid = grid();
        let plain = grid.set(0, 0, Segment::new(SegmentType::ReadoutInput));
        let b = grid.set(1, 0, Segment::new(SegmentType::ReadoutInput).with_label('b'));
        let a = grid.set(2, 0, Segment::new(SegmentType::ReadoutInput).with_label('a'));
        grid.set(3, 0, seg(SegmentType::PlatformStartLeft, 0));
        grid.set(4, 4, Segment::new(SegmentType::Pixel));
        let links: LinkTable = LinkTable::new();

        let sorted = generate_truth_table(&grid, &links, true);
        assert_eq!(sorted.inputs, vec![a, b, plain]);
        assert_eq!(sorted.first_truth_table().map(TruthTable::rows), Some(8));

        let unsorted = generate_truth_table(&grid, &links, false);
        assert_eq!(unsorted.inputs, vec![plain, b, a]);
        assert_eq!(display_label(&grid, plain), '?');
        assert_eq!(display_label(&grid, a), 'a');
    }

    #[test]
    fn test_walk_from_track_point_follows_heading() {
        let mut grid = grid();
        grid.set(0, 0, seg(SegmentType::PlatformStartLeft, 0));
        grid.set(1, 0, seg(SegmentType::Straight, 0));
        let middle = grid.set(2, 0, seg(SegmentType::Straight, 0));
        grid.set(3, 0, seg(SegmentType::Straight, 0));
        let links: LinkTable = LinkTable::new();
        let limit = hop_limit(grid.len(), 4);

        let point = grid.closest_on_track(Vec2::new(20.0, -4.0), &TrackSettings::default()).unwrap();
        assert_eq!(point.segment, middle);

        let east = TrackCursor::from_on_track_point(&point, 0.3);
        assert_eq!(east, TrackCursor { segment: middle, path_id: 0, entered_at: 0.0 });
        let outcome = walk_from(&grid, &links, east, &mut SwitchPathIds::new(), limit);
        assert_eq!(outcome, WalkOutcome::Stopped { hops: 1 });

        let west = TrackCursor::from_on_track_point(&point, -std::f32::consts::PI);
        assert_eq!(west.entered_at, 1.0);
        let outcome = walk_from(&grid, &links, west, &mut SwitchPathIds::new(), limit);
        assert_eq!(outcome, WalkOutcome::Stopped { hops: 2 });
    }

    #[test]
    fn test_hop_limit_scales_with_track() {
        assert_eq!(hop_limit(0, 4), 16);
        assert_eq!(hop_limit(10, 4), 160);
        assert!(hop_limit(10, 0) > 10 * MAX_PATHS_PER_SEGMENT);
    }
}
