//! Flippy track command-line front end
//!
//! Usage: `flippy-track <track.json> [settings.json]`
//!
//! Loads a track snapshot, generates its truth tables and prints them.
//! Set `RUST_LOG=debug` for placement and pruning detail.

use std::process::ExitCode;
use std::sync::Arc;

use flippy_track::track::{display_label, generate_truth_table_with_settings};
use flippy_track::{
    PathCatalog, SegmentId, TrackGrid, TrackSettings, TrackSnapshot, TrackTruthTable,
    TruthTableState,
};

fn print_truth_tables(grid: &TrackGrid, result: &TrackTruthTable) {
    let header = |ids: &[SegmentId]| -> String {
        ids.iter()
            .map(|&id| display_label(grid, id).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };

    match result.state {
        TruthTableState::Initialized => {}
        TruthTableState::MissingSegments => {
            println!("Track needs at least one start platform, input and output");
            return;
        }
        TruthTableState::InfiniteLoopDetected => {
            println!("Warning: infinite loop detected; rows marked with * did not finish");
        }
    }

    for (start, table) in result.starts.iter().zip(&result.truth_tables) {
        println!("\nStart {} ({start})", display_label(grid, *start));
        println!("{} | {}", header(&result.inputs), header(&result.outputs));
        for (inputs, outputs) in table.iter() {
            let marker = if table.row_looped(&inputs) { " *" } else { "" };
            let join = |values: &[usize]| {
                values.iter().map(usize::to_string).collect::<Vec<_>>().join(" ")
            };
            println!("{} | {}{marker}", join(&inputs), join(outputs));
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(track_path) = args.next() else {
        eprintln!("usage: flippy-track <track.json> [settings.json]");
        return ExitCode::from(2);
    };
    let settings = args.next().map(TrackSettings::load).unwrap_or_default();

    let snapshot = match TrackSnapshot::load(&track_path) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            eprintln!("failed to load {track_path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (grid, links) = snapshot.restore(&settings, Arc::new(PathCatalog::new()));
    log::info!("Track {track_path}: {} segments, {} links", grid.len(), links.len());

    let result = generate_truth_table_with_settings(&grid, &links, &settings);
    print_truth_tables(&grid, &result);
    ExitCode::SUCCESS
}
