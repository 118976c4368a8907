//! Links: symmetric pairs of segments whose switches move together
//!
//! Each pair carries an opaque connector value owned by whoever draws the
//! link. The table stores ids only and is not updated when a segment leaves
//! the grid; call [`LinkTable::erase_all`] alongside [`TrackGrid::erase`].

use std::collections::{BTreeMap, HashSet};

use super::grid::TrackGrid;
use super::segment::{SegmentId, SwitchPathIds};

/// Unordered segment pair, smaller id first
fn pair_key(a: SegmentId, b: SegmentId) -> (SegmentId, SegmentId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Symmetric relation over segment ids with a connector per pair
#[derive(Debug, Clone)]
pub struct LinkTable<C = ()> {
    links: BTreeMap<(SegmentId, SegmentId), C>,
}

impl<C> Default for LinkTable<C> {
    fn default() -> Self {
        Self {
            links: BTreeMap::new(),
        }
    }
}

impl<C> LinkTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link; false if the pair already exists or `a == b`
    pub fn insert(&mut self, a: SegmentId, b: SegmentId, connector: C) -> bool {
        if a == b {
            return false;
        }
        let key = pair_key(a, b);
        if self.links.contains_key(&key) {
            return false;
        }
        self.links.insert(key, connector);
        true
    }

    /// Add or overwrite a link, returning the previous connector
    pub fn set(&mut self, a: SegmentId, b: SegmentId, connector: C) -> Option<C> {
        if a == b {
            return None;
        }
        self.links.insert(pair_key(a, b), connector)
    }

    pub fn get(&self, a: SegmentId, b: SegmentId) -> Option<&C> {
        self.links.get(&pair_key(a, b))
    }

    pub fn contains(&self, a: SegmentId, b: SegmentId) -> bool {
        self.links.contains_key(&pair_key(a, b))
    }

    /// Every segment linked to `a`
    pub fn get_linked(&self, a: SegmentId) -> Vec<SegmentId> {
        self.links
            .keys()
            .filter_map(|&(x, y)| {
                if x == a {
                    Some(y)
                } else if y == a {
                    Some(x)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn erase(&mut self, a: SegmentId, b: SegmentId) -> Option<C> {
        self.links.remove(&pair_key(a, b))
    }

    /// Remove every link touching `a`; returns how many went
    pub fn erase_all(&mut self, a: SegmentId) -> usize {
        let before = self.links.len();
        self.links.retain(|&(x, y), _| x != a && y != a);
        before - self.links.len()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, SegmentId, &C)> + '_ {
        self.links.iter().map(|(&(a, b), c)| (a, b, c))
    }

    /// Links with both ends inside `ids`
    pub fn intersect(&self, ids: &[SegmentId]) -> Vec<(SegmentId, SegmentId)> {
        let ids: HashSet<SegmentId> = ids.iter().copied().collect();
        self.links
            .keys()
            .filter(|(a, b)| ids.contains(a) && ids.contains(b))
            .copied()
            .collect()
    }
}

/// Set a segment's switch and copy it to every directly linked segment
///
/// Propagation is one level deep. Linked segments are written even when
/// they already hold the value. Returns the ids that were written.
pub fn set_switch_path_id<C>(
    links: &LinkTable<C>,
    grid: &mut TrackGrid,
    id: SegmentId,
    switch_path_id: usize,
) -> Vec<SegmentId> {
    let mut written = Vec::new();
    for target in std::iter::once(id).chain(links.get_linked(id)) {
        if grid
            .segment_mut(target)
            .is_some_and(|segment| segment.set_switch_path_id(switch_path_id))
        {
            written.push(target);
        }
    }
    written
}

/// [`set_switch_path_id`] against a what-if map instead of the grid
pub fn set_switch_path_id_in<C>(
    links: &LinkTable<C>,
    id: SegmentId,
    switch_path_id: usize,
    switch_path_ids: &mut SwitchPathIds,
) {
    switch_path_ids.insert(id, switch_path_id);
    for linked in links.get_linked(id) {
        switch_path_ids.insert(linked, switch_path_id);
    }
}

/// Advance a switch to its next value (wrapping) and propagate it
///
/// Returns the new value, or `None` if the segment has no switch.
pub fn toggle_switch_path_id<C>(
    links: &LinkTable<C>,
    grid: &mut TrackGrid,
    id: SegmentId,
) -> Option<usize> {
    let segment = grid.segment(id)?;
    let count = segment.segment_type.switch_value_count();
    let current = segment.switch_path_id()?;
    if count == 0 {
        return None;
    }
    let next = (current + 1) % count;
    set_switch_path_id(links, grid, id, next);
    Some(next)
}
