//! Sparse integer grid storage
//!
//! An unbounded 2-D grid of cells, allocated in fixed-size square sectors:
//! - Sector coordinates use floor division, so negative cells behave
//! - Every sector is allocated whole on first write
//! - Empty cells hold a caller-chosen null value

pub mod sector;

pub use sector::{Iter, Position, SectorGrid};
