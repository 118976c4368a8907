//! Track settings
//!
//! Stored as JSON next to track files. Missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_SECTOR_SIZE, DEFAULT_SEGMENT_SIZE, DEFAULT_VALUE_CARDINALITY};

/// Tunable constants for grids and simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    // === Grid ===
    /// World units per cell edge
    pub segment_size: f32,
    /// Sector edge length, in cells
    pub sector_size: usize,

    // === Queries ===
    /// Cells searched around a point for the closest track
    pub search_radius: i32,
    /// Progress step for closest-point sampling
    pub progress_precision: f32,

    // === Simulation ===
    /// Distinct values per input/output
    pub value_cardinality: usize,
    /// Multiplier on the per-walk hop limit
    pub loop_bound_factor: usize,
    /// Order starts, inputs and outputs by label
    pub sort_by_label: bool,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            sector_size: DEFAULT_SECTOR_SIZE,

            search_radius: 1,
            progress_precision: 0.01,

            value_cardinality: DEFAULT_VALUE_CARDINALITY,
            loop_bound_factor: 4,
            sort_by_label: true,
        }
    }
}

/// Largest accepted sector edge; a sector is allocated whole
pub const MAX_SECTOR_SIZE: usize = 4096;

impl TrackSettings {
    /// Parse settings; out-of-range fields are reset by [`validate`](Self::validate)
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Reset every out-of-range field to its default
    ///
    /// Returns true if all fields were already valid.
    pub fn validate(&mut self) -> bool {
        let defaults = Self::default();
        let mut valid = true;

        if !(self.segment_size.is_finite() && self.segment_size > 0.0) {
            log::warn!("Invalid segment_size {}; using {}", self.segment_size, defaults.segment_size);
            self.segment_size = defaults.segment_size;
            valid = false;
        }
        if self.sector_size == 0 || self.sector_size > MAX_SECTOR_SIZE {
            log::warn!("Invalid sector_size {}; using {}", self.sector_size, defaults.sector_size);
            self.sector_size = defaults.sector_size;
            valid = false;
        }
        if self.search_radius < 0 {
            log::warn!("Invalid search_radius {}; using {}", self.search_radius, defaults.search_radius);
            self.search_radius = defaults.search_radius;
            valid = false;
        }
        if !(self.progress_precision.is_finite()
            && self.progress_precision > 0.0
            && self.progress_precision <= 1.0)
        {
            log::warn!(
                "Invalid progress_precision {}; using {}",
                self.progress_precision,
                defaults.progress_precision
            );
            self.progress_precision = defaults.progress_precision;
            valid = false;
        }
        if self.value_cardinality == 0 {
            log::warn!("Invalid value_cardinality 0; using {}", defaults.value_cardinality);
            self.value_cardinality = defaults.value_cardinality;
            valid = false;
        }
        valid
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a file, falling back to defaults on any failure
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("Could not read settings {}: {err}; using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                log::warn!("Invalid settings {}: {err}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
