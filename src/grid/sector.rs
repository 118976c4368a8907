//! Dense sector table
//!
//! Cells are grouped into square sectors of `sector_size × sector_size` slots.
//! A sector is a preallocated block: memory grows with the number of touched
//! sectors, not with the density of data inside them. Sectors are found through
//! a hash table keyed by sector coordinate.
//!
//! Cell coordinates are never stored; iteration derives them from the sector
//! coordinate and slot index.

use std::collections::HashMap;

type SectorCoord = (i32, i32);

/// One preallocated block of cells
#[derive(Debug, Clone)]
struct Sector<V> {
    coord: SectorCoord,
    slots: Vec<V>,
}

/// Infinite integer-indexed 2-D grid backed by a table of dense sectors
#[derive(Debug, Clone)]
pub struct SectorGrid<V> {
    sector_size: usize,
    /// Value meaning "no point here"
    null: V,
    /// Sector coordinate -> position in `sectors`
    index: HashMap<SectorCoord, usize>,
    /// Sectors in insertion order (until a prune reorders them)
    sectors: Vec<Sector<V>>,
}

/// Cell coordinate of a slot
///
/// The sector origin can lie below `i32::MIN` when the sector size does not
/// divide 2^31, so the sum is formed in i64; the cell itself always fits.
#[inline]
fn cell_coord(sector_size: usize, sector: SectorCoord, slot: usize) -> (i32, i32) {
    let s = sector_size as i64;
    let x = i64::from(sector.0) * s + (slot % sector_size) as i64;
    let y = i64::from(sector.1) * s + (slot / sector_size) as i64;
    (x as i32, y as i32)
}

/// Storage location of a cell, detached from any borrow of the grid
///
/// Obtained from [`Iter::position`] and consumed by
/// [`SectorGrid::erase_position`]. Erasing through a position whose sector
/// has since been pruned does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    sector: SectorCoord,
    slot: usize,
}

impl<V: Clone + PartialEq> SectorGrid<V> {
    /// Create an empty grid
    ///
    /// Panics if `sector_size` is zero.
    pub fn new(sector_size: usize, null: V) -> Self {
        Self::with_capacity(sector_size, 0, null)
    }

    /// Create an empty grid with room for `sector_capacity` sectors before rehashing
    pub fn with_capacity(sector_size: usize, sector_capacity: usize, null: V) -> Self {
        assert!(sector_size > 0, "sector size must be positive");
        Self {
            sector_size,
            null,
            index: HashMap::with_capacity(sector_capacity),
            sectors: Vec::with_capacity(sector_capacity),
        }
    }

    #[inline]
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    #[inline]
    pub fn null_value(&self) -> &V {
        &self.null
    }

    #[inline]
    fn sector_coord(&self, x: i32, y: i32) -> SectorCoord {
        let s = self.sector_size as i32;
        (x.div_euclid(s), y.div_euclid(s))
    }

    #[inline]
    fn slot_index(&self, x: i32, y: i32) -> usize {
        let s = self.sector_size as i32;
        (y.rem_euclid(s) * s + x.rem_euclid(s)) as usize
    }

    #[inline]
    fn slot_len(&self) -> usize {
        self.sector_size * self.sector_size
    }

    fn sector(&self, x: i32, y: i32) -> Option<&Sector<V>> {
        self.index
            .get(&self.sector_coord(x, y))
            .map(|&i| &self.sectors[i])
    }

    fn sector_is_null(&self, sector: &Sector<V>) -> bool {
        sector.slots.iter().all(|v| *v == self.null)
    }

    /// Find or allocate the sector owning a cell
    fn sector_mut_or_insert(&mut self, x: i32, y: i32) -> &mut Sector<V> {
        let coord = self.sector_coord(x, y);
        let i = match self.index.get(&coord) {
            Some(&i) => i,
            None => {
                let i = self.sectors.len();
                self.sectors.push(Sector {
                    coord,
                    slots: vec![self.null.clone(); self.slot_len()],
                });
                self.index.insert(coord, i);
                i
            }
        };
        &mut self.sectors[i]
    }

    /// Drop the sector at position `i`, keeping the index consistent
    fn remove_sector(&mut self, i: usize) {
        let removed = self.sectors.swap_remove(i);
        self.index.remove(&removed.coord);
        if let Some(moved) = self.sectors.get(i) {
            self.index.insert(moved.coord, i);
        }
        log::debug!("Pruned sector {:?}", removed.coord);
    }

    /// Value at a cell, or the null value if unset
    pub fn get(&self, x: i32, y: i32) -> &V {
        match self.sector(x, y) {
            Some(sector) => &sector.slots[self.slot_index(x, y)],
            None => &self.null,
        }
    }

    /// Write a cell, allocating its sector if needed
    ///
    /// Writing the null value is allowed; it clears the slot but never prunes.
    pub fn set(&mut self, x: i32, y: i32, value: V) {
        *self.point_mut(x, y) = value;
    }

    /// Mutable access to a cell, allocating its sector if needed
    pub fn point_mut(&mut self, x: i32, y: i32) -> &mut V {
        let slot = self.slot_index(x, y);
        &mut self.sector_mut_or_insert(x, y).slots[slot]
    }

    /// Clear a cell
    ///
    /// With `prune`, the owning sector is dropped if it is left entirely null;
    /// returns true only in that case.
    pub fn erase(&mut self, x: i32, y: i32, prune: bool) -> bool {
        let Some(&i) = self.index.get(&self.sector_coord(x, y)) else {
            return false;
        };
        let slot = self.slot_index(x, y);
        self.sectors[i].slots[slot] = self.null.clone();
        if prune && self.sector_is_null(&self.sectors[i]) {
            self.remove_sector(i);
            return true;
        }
        false
    }

    /// Clear the cell at an iterator position
    ///
    /// Same contract as [`erase`](Self::erase). Returns false for a position
    /// whose sector no longer exists.
    pub fn erase_position(&mut self, position: Position, prune: bool) -> bool {
        let Some(&i) = self.index.get(&position.sector) else {
            return false;
        };
        let null = self.null.clone();
        let Some(slot) = self.sectors[i].slots.get_mut(position.slot) else {
            return false;
        };
        *slot = null;
        if prune && self.sector_is_null(&self.sectors[i]) {
            self.remove_sector(i);
            return true;
        }
        false
    }

    /// Number of non-null cells (walks every sector)
    pub fn point_count(&self) -> usize {
        self.sectors
            .iter()
            .flat_map(|s| s.slots.iter())
            .filter(|v| **v != self.null)
            .count()
    }

    /// Number of allocated sectors, including all-null ones not yet pruned
    #[inline]
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Number of non-null cells in the sector owning (x, y)
    pub fn sector_point_count(&self, x: i32, y: i32) -> usize {
        self.sector(x, y)
            .map(|s| s.slots.iter().filter(|v| **v != self.null).count())
            .unwrap_or(0)
    }

    /// True if the sector owning (x, y) is absent or holds only null values
    pub fn sector_empty(&self, x: i32, y: i32) -> bool {
        self.sector(x, y)
            .map(|s| self.sector_is_null(s))
            .unwrap_or(true)
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.iter().all(|s| self.sector_is_null(s))
    }

    /// Drop every all-null sector; returns how many were dropped
    pub fn prune_sectors(&mut self) -> usize {
        let mut pruned = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            if self.sector_is_null(&self.sectors[i]) {
                // swap_remove pulls an unchecked sector into slot i
                self.remove_sector(i);
                pruned += 1;
            } else {
                i += 1;
            }
        }
        pruned
    }

    /// Drop the sector owning (x, y) if it exists and is all null
    pub fn prune_sector(&mut self, x: i32, y: i32) -> bool {
        let Some(&i) = self.index.get(&self.sector_coord(x, y)) else {
            return false;
        };
        if !self.sector_is_null(&self.sectors[i]) {
            return false;
        }
        self.remove_sector(i);
        true
    }

    /// Remove all sectors
    pub fn clear(&mut self) {
        self.index.clear();
        self.sectors.clear();
    }

    /// Iterate non-null cells: sector order, then ascending slot within a sector
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self, 0, 0)
    }

    /// Iterator positioned at (x, y) if that cell is non-null, else at the end
    pub fn find_point(&self, x: i32, y: i32) -> Iter<'_, V> {
        match self.index.get(&self.sector_coord(x, y)) {
            Some(&i) if self.sectors[i].slots[self.slot_index(x, y)] != self.null => {
                Iter::new(self, i, self.slot_index(x, y))
            }
            _ => Iter::end(self),
        }
    }

    /// Like [`iter`](Self::iter), yielding mutable values
    pub fn iter_mut(&mut self) -> impl Iterator<Item = ((i32, i32), &mut V)> + '_ {
        let Self {
            sector_size,
            null,
            sectors,
            ..
        } = self;
        let sector_size = *sector_size;
        let null = &*null;
        sectors.iter_mut().flat_map(move |sector| {
            let coord = sector.coord;
            sector
                .slots
                .iter_mut()
                .enumerate()
                .filter(move |(_, v)| **v != *null)
                .map(move |(slot, v)| (cell_coord(sector_size, coord, slot), v))
        })
    }
}

/// Forward iterator over the non-null cells of a [`SectorGrid`]
///
/// Always rests on a non-null cell or at the end.
#[derive(Debug, Clone)]
pub struct Iter<'a, V> {
    grid: &'a SectorGrid<V>,
    sector: usize,
    slot: usize,
}

impl<'a, V: Clone + PartialEq> Iter<'a, V> {
    fn new(grid: &'a SectorGrid<V>, sector: usize, slot: usize) -> Self {
        let mut iter = Self { grid, sector, slot };
        iter.seek();
        iter
    }

    fn end(grid: &'a SectorGrid<V>) -> Self {
        Self {
            grid,
            sector: grid.sectors.len(),
            slot: 0,
        }
    }

    /// Advance to the next non-null slot at or after the current position
    fn seek(&mut self) {
        let len = self.grid.slot_len();
        while let Some(sector) = self.grid.sectors.get(self.sector) {
            while self.slot < len {
                if sector.slots[self.slot] != self.grid.null {
                    return;
                }
                self.slot += 1;
            }
            self.sector += 1;
            self.slot = 0;
        }
        self.slot = 0;
    }

    /// True once every point has been yielded
    #[inline]
    pub fn is_end(&self) -> bool {
        self.sector >= self.grid.sectors.len()
    }

    /// Storage location the iterator rests on, for [`SectorGrid::erase_position`]
    pub fn position(&self) -> Option<Position> {
        let sector = self.grid.sectors.get(self.sector)?;
        Some(Position {
            sector: sector.coord,
            slot: self.slot,
        })
    }

    /// Cell and value the iterator rests on, without advancing
    pub fn current(&self) -> Option<((i32, i32), &'a V)> {
        let grid = self.grid;
        let sector = grid.sectors.get(self.sector)?;
        Some((
            cell_coord(grid.sector_size, sector.coord, self.slot),
            &sector.slots[self.slot],
        ))
    }
}

impl<'a, V: Clone + PartialEq> Iterator for Iter<'a, V> {
    type Item = ((i32, i32), &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.current()?;
        self.slot += 1;
        self.seek();
        Some(item)
    }
}

impl<'a, V: Clone + PartialEq> IntoIterator for &'a SectorGrid<V> {
    type Item = ((i32, i32), &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
