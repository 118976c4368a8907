//! Track model: segments on a grid, switch links, and truth-table simulation
//!
//! - `segment`: piece types, their paths and switches
//! - `grid`: segment arena on a sector grid with world-space queries
//! - `links`: switch links and propagation
//! - `truth`: truth table storage and odometer enumeration
//! - `simulate`: train walk and truth table generation

pub mod grid;
pub mod links;
pub mod segment;
pub mod simulate;
pub mod truth;

pub use grid::{Connection, OnTrackPoint, TrackGrid};
pub use links::{LinkTable, set_switch_path_id, set_switch_path_id_in, toggle_switch_path_id};
pub use segment::{FlipDirection, Segment, SegmentId, SegmentType, SwitchPathIds};
pub use simulate::{
    TrackCursor, WalkOutcome, display_label, generate_truth_table,
    generate_truth_table_with_settings, walk, walk_from,
};
pub use truth::{TrackTruthTable, TruthTable, TruthTableState};
