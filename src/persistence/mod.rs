//! Track snapshots
//!
//! A snapshot is the logical content of a track:
//! - Per segment: cell, type, rotation, switch and label
//! - Per link: the cells of both ends
//!
//! Links are stored by cell rather than by segment id, since ids are only
//! meaningful to the grid that issued them.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::path::PathCatalog;
use crate::settings::TrackSettings;
use crate::track::{LinkTable, Segment, SegmentType, TrackGrid};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub cell: (i32, i32),
    pub segment_type: SegmentType,
    #[serde(default)]
    pub rotation_quarters: i32,
    #[serde(default)]
    pub switch_path_id: Option<usize>,
    #[serde(default)]
    pub label: Option<char>,
}

impl SegmentRecord {
    fn to_segment(&self) -> Segment {
        let mut segment = Segment::new(self.segment_type).with_rotation(self.rotation_quarters);
        segment.label = self.label;
        if let Some(switch_path_id) = self.switch_path_id {
            segment.set_switch_path_id(switch_path_id);
        }
        segment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub a: (i32, i32),
    pub b: (i32, i32),
}

/// Serializable grid and link topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub version: u32,
    pub segment_size: f32,
    pub segments: Vec<SegmentRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl TrackSnapshot {
    /// Record a grid and its links; links to segments no longer on the grid are dropped
    pub fn capture<C>(grid: &TrackGrid, links: &LinkTable<C>) -> Self {
        let segments = grid
            .iter()
            .filter_map(|(cell, id)| {
                let segment = grid.segment(id)?;
                Some(SegmentRecord {
                    cell,
                    segment_type: segment.segment_type,
                    rotation_quarters: segment.rotation_quarters(),
                    switch_path_id: segment.switch_path_id(),
                    label: segment.label,
                })
            })
            .collect();
        let links = links
            .iter()
            .filter_map(|(a, b, _)| {
                Some(LinkRecord {
                    a: grid.cell_of(a)?,
                    b: grid.cell_of(b)?,
                })
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            segment_size: grid.segment_size(),
            segments,
            links,
        }
    }

    /// Rebuild the grid and links
    ///
    /// Links whose ends do not resolve to segments are skipped with a warning.
    pub fn restore(&self, settings: &TrackSettings, catalog: Arc<PathCatalog>) -> (TrackGrid, LinkTable) {
        if self.version > SNAPSHOT_VERSION {
            log::warn!(
                "Snapshot version {} is newer than supported version {SNAPSHOT_VERSION}",
                self.version
            );
        }
        let mut grid = TrackGrid::with_sector_size(self.segment_size, settings.sector_size, catalog);
        for record in &self.segments {
            grid.set(record.cell.0, record.cell.1, record.to_segment());
        }

        let mut links = LinkTable::new();
        for record in &self.links {
            match (grid.get(record.a.0, record.a.1), grid.get(record.b.0, record.b.1)) {
                (Some(a), Some(b)) => {
                    links.insert(a, b, ());
                }
                _ => log::warn!("Skipping link {:?} - {:?}: missing segment", record.a, record.b),
            }
        }
        log::debug!("Restored {} segments and {} links", grid.len(), links.len());
        (grid, links)
    }

    /// Parse a snapshot; a segment size that is not a positive finite number is an error
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        if !(snapshot.segment_size.is_finite() && snapshot.segment_size > 0.0) {
            return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "segment_size must be positive, got {}",
                snapshot.segment_size
            )));
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let snapshot = Self::from_json(&json)?;
        log::info!(
            "Loaded track {} ({} segments)",
            path.as_ref().display(),
            snapshot.segments.len()
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)
    }
}
