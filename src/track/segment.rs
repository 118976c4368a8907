//! Track segments: the piece types a player places on the grid
//!
//! A segment is pure data (type, rotation, switch, label). Its cell and its
//! world-space geometry are owned by the [`TrackGrid`](super::TrackGrid).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_VALUE_CARDINALITY;
use crate::normalize_rotation_quarters;
use crate::path::{Path, PathCatalog, PathShape};

/// Stable handle for a segment owned by a track grid
///
/// Handles are never reused by the grid that issued them, so a stale handle
/// simply fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What-if switch settings, consulted instead of the segments' own switches
pub type SwitchPathIds = HashMap<SegmentId, usize>;

/// Mirror axis for [`Segment::flip`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipDirection {
    /// Left and right swap (x → -x)
    Horizontal,
    /// Top and bottom swap (y → -y)
    Vertical,
}

/// Kind of track piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SegmentType {
    #[default]
    None,
    Straight,
    Curve,
    /// Straight and left curve sharing their start corner
    JoinLeft,
    /// Straight and right curve sharing their end corner
    JoinRight,
    JogLeft,
    JogRight,
    /// Both jogs, crossing in the middle
    Cross,
    PlatformLeft,
    PlatformStartLeft,
    ReadoutInput,
    ReadoutOutput,
    PlatformRight,
    PlatformStartRight,
    /// Output readout drawn as a single pixel of a display
    Pixel,
}

impl SegmentType {
    /// Paths carried by this type, as (shape, rotation relative to the segment)
    pub fn path_layout(self) -> &'static [(PathShape, i32)] {
        match self {
            SegmentType::None
            | SegmentType::ReadoutInput
            | SegmentType::ReadoutOutput
            | SegmentType::Pixel => &[],
            SegmentType::Straight => &[(PathShape::Straight, 0)],
            SegmentType::Curve => &[(PathShape::Curve, 0)],
            SegmentType::JoinLeft => &[(PathShape::Straight, 0), (PathShape::Curve, 0)],
            SegmentType::JoinRight => &[(PathShape::Straight, 2), (PathShape::Curve, 1)],
            SegmentType::JogLeft => &[(PathShape::JogLeft, 0)],
            SegmentType::JogRight => &[(PathShape::JogRight, 0)],
            SegmentType::Cross => &[(PathShape::JogLeft, 0), (PathShape::JogRight, 0)],
            SegmentType::PlatformLeft | SegmentType::PlatformStartLeft => &[(PathShape::Half, 0)],
            SegmentType::PlatformRight | SegmentType::PlatformStartRight => {
                &[(PathShape::HalfLeft, 0)]
            }
        }
    }

    #[inline]
    pub fn path_count(self) -> usize {
        self.path_layout().len()
    }

    /// Whether the type holds a switch value
    pub fn can_switch(self) -> bool {
        matches!(
            self,
            SegmentType::JoinLeft
                | SegmentType::JoinRight
                | SegmentType::ReadoutInput
                | SegmentType::ReadoutOutput
                | SegmentType::Pixel
        )
    }

    /// Number of distinct switch values (0 for types without a switch)
    pub fn switch_value_count(self) -> usize {
        match self {
            SegmentType::JoinLeft | SegmentType::JoinRight => 2,
            SegmentType::ReadoutInput | SegmentType::ReadoutOutput | SegmentType::Pixel => {
                DEFAULT_VALUE_CARDINALITY
            }
            _ => 0,
        }
    }

    /// Progress end at which a switched join's paths meet
    ///
    /// A train entering at this end follows the switch; entering at the other
    /// end trails through it.
    pub fn shared_switch_progress(self) -> Option<f32> {
        match self {
            SegmentType::JoinLeft => Some(0.0),
            SegmentType::JoinRight => Some(1.0),
            _ => None,
        }
    }

    /// Whether the type has a mirror-image counterpart
    pub fn can_flip(self) -> bool {
        self.mirrored().is_some()
    }

    /// Horizontal mirror image: (type, rotation offset) such that mirroring
    /// this type at rotation r gives the returned type at `offset - r`
    fn mirrored(self) -> Option<(SegmentType, i32)> {
        match self {
            SegmentType::JoinLeft => Some((SegmentType::JoinRight, 2)),
            SegmentType::JoinRight => Some((SegmentType::JoinLeft, 2)),
            SegmentType::JogLeft => Some((SegmentType::JogRight, 0)),
            SegmentType::JogRight => Some((SegmentType::JogLeft, 0)),
            SegmentType::PlatformLeft => Some((SegmentType::PlatformRight, 0)),
            SegmentType::PlatformRight => Some((SegmentType::PlatformLeft, 0)),
            SegmentType::PlatformStartLeft => Some((SegmentType::PlatformStartRight, 0)),
            SegmentType::PlatformStartRight => Some((SegmentType::PlatformStartLeft, 0)),
            _ => None,
        }
    }

    pub fn is_platform_start(self) -> bool {
        matches!(
            self,
            SegmentType::PlatformStartLeft | SegmentType::PlatformStartRight
        )
    }

    pub fn is_input(self) -> bool {
        self == SegmentType::ReadoutInput
    }

    pub fn is_output(self) -> bool {
        matches!(self, SegmentType::ReadoutOutput | SegmentType::Pixel)
    }
}

/// A placed (or to-be-placed) track piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_type: SegmentType,
    /// Counter-clockwise quarter turns, normalized to [0, 3]
    rotation_quarters: i32,
    /// Single-character name used for sorting inputs and outputs
    #[serde(default)]
    pub label: Option<char>,
    /// Selected path (joins) or held value (readouts); `None` without a switch
    #[serde(default)]
    switch_path_id: Option<usize>,
}

impl Segment {
    pub fn new(segment_type: SegmentType) -> Self {
        Self {
            segment_type,
            rotation_quarters: 0,
            label: None,
            switch_path_id: segment_type.can_switch().then_some(0),
        }
    }

    pub fn with_rotation(mut self, rotation_quarters: i32) -> Self {
        self.set_rotation_quarters(rotation_quarters);
        self
    }

    pub fn with_label(mut self, label: char) -> Self {
        self.label = Some(label);
        self
    }

    #[inline]
    pub fn rotation_quarters(&self) -> i32 {
        self.rotation_quarters
    }

    pub fn set_rotation_quarters(&mut self, rotation_quarters: i32) {
        self.rotation_quarters = normalize_rotation_quarters(rotation_quarters);
    }

    #[inline]
    pub fn can_switch(&self) -> bool {
        self.segment_type.can_switch()
    }

    #[inline]
    pub fn switch_path_id(&self) -> Option<usize> {
        self.switch_path_id
    }

    /// Set the switch; returns false (and does nothing) if the type has no switch
    pub fn set_switch_path_id(&mut self, switch_path_id: usize) -> bool {
        if !self.can_switch() {
            return false;
        }
        self.switch_path_id = Some(switch_path_id);
        true
    }

    #[inline]
    pub fn can_flip(&self) -> bool {
        self.segment_type.can_flip()
    }

    /// Replace the segment with its mirror image in place
    ///
    /// Path ids, switch and label carry over. Returns false (and does nothing)
    /// for types without a mirrored counterpart.
    pub fn flip(&mut self, direction: FlipDirection) -> bool {
        let Some((segment_type, offset)) = self.segment_type.mirrored() else {
            return false;
        };
        // A vertical mirror is the horizontal one followed by a half turn
        let half_turns = match direction {
            FlipDirection::Horizontal => 0,
            FlipDirection::Vertical => 2,
        };
        self.segment_type = segment_type;
        self.set_rotation_quarters(offset - self.rotation_quarters + half_turns);
        true
    }

    #[inline]
    pub fn path_count(&self) -> usize {
        self.segment_type.path_count()
    }

    /// Catalog path for `path_id`, composed with the segment's rotation
    pub fn path<'a>(&self, catalog: &'a PathCatalog, path_id: usize) -> Option<&'a Path> {
        let &(shape, rotation) = self.segment_type.path_layout().get(path_id)?;
        Some(catalog.get(shape, self.rotation_quarters + rotation))
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::new(SegmentType::None)
    }
}
