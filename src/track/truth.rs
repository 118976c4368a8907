//! Truth tables produced by simulating a track
//!
//! Rows follow odometer order over the inputs: all zeros first, last input
//! varying fastest.

use serde::{Deserialize, Serialize};

use super::segment::SegmentId;

/// Outcome of a truth table generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TruthTableState {
    #[default]
    Initialized,
    /// No start platform, input or output on the track
    MissingSegments,
    /// At least one walk hit the hop limit
    InfiniteLoopDetected,
}

/// Output values for every input permutation, for one start platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthTable {
    input_count: usize,
    output_count: usize,
    value_cardinality: usize,
    /// `row_count * output_count` values, row-major
    results: Vec<usize>,
    /// Rows whose walk was cut off by the hop limit
    looped: Vec<bool>,
}

impl TruthTable {
    pub fn new(input_count: usize, output_count: usize, value_cardinality: usize) -> Self {
        assert!(value_cardinality >= 1, "value cardinality must be at least 1");
        let rows = Self::row_count(input_count, value_cardinality);
        Self {
            input_count,
            output_count,
            value_cardinality,
            results: vec![0; rows * output_count],
            looped: vec![false; rows],
        }
    }

    /// K^N
    pub fn row_count(input_count: usize, value_cardinality: usize) -> usize {
        (0..input_count).fold(1, |rows, _| rows * value_cardinality)
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn value_cardinality(&self) -> usize {
        self.value_cardinality
    }

    pub fn rows(&self) -> usize {
        self.looped.len()
    }

    /// All-zero input vector
    pub fn input_values_first(input_count: usize) -> Vec<usize> {
        vec![0; input_count]
    }

    /// Step `values` to the next permutation; false once every one was visited
    ///
    /// On false the vector has wrapped back to all zeros.
    pub fn input_values_successor(values: &mut [usize], value_cardinality: usize) -> bool {
        for value in values.iter_mut().rev() {
            *value += 1;
            if *value < value_cardinality {
                return true;
            }
            *value = 0;
        }
        false
    }

    fn row_index(&self, input_values: &[usize]) -> usize {
        assert_eq!(input_values.len(), self.input_count, "wrong number of inputs");
        input_values.iter().fold(0, |index, &value| {
            debug_assert!(value < self.value_cardinality);
            index * self.value_cardinality + value
        })
    }

    pub fn output_values(&self, input_values: &[usize]) -> &[usize] {
        let start = self.row_index(input_values) * self.output_count;
        &self.results[start..start + self.output_count]
    }

    pub fn output_values_mut(&mut self, input_values: &[usize]) -> &mut [usize] {
        let start = self.row_index(input_values) * self.output_count;
        &mut self.results[start..start + self.output_count]
    }

    pub fn row_looped(&self, input_values: &[usize]) -> bool {
        self.looped[self.row_index(input_values)]
    }

    pub fn set_row_looped(&mut self, input_values: &[usize], looped: bool) {
        let index = self.row_index(input_values);
        self.looped[index] = looped;
    }

    /// (inputs, outputs) for every row in odometer order
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, &[usize])> + '_ {
        let mut next = Some(Self::input_values_first(self.input_count));
        std::iter::from_fn(move || {
            let inputs = next.take()?;
            let mut successor = inputs.clone();
            if Self::input_values_successor(&mut successor, self.value_cardinality) {
                next = Some(successor);
            }
            Some(inputs)
        })
        .map(|inputs| {
            let outputs = self.output_values(&inputs);
            (inputs, outputs)
        })
    }
}

/// Truth tables for every start platform of a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTruthTable {
    pub state: TruthTableState,
    /// Start platforms, one table each, in table order
    pub starts: Vec<SegmentId>,
    /// Input readouts in column order
    pub inputs: Vec<SegmentId>,
    /// Output readouts in column order
    pub outputs: Vec<SegmentId>,
    pub truth_tables: Vec<TruthTable>,
}

impl TrackTruthTable {
    pub fn first_truth_table(&self) -> Option<&TruthTable> {
        self.truth_tables.first()
    }

    pub fn truth_table_for(&self, start: SegmentId) -> Option<&TruthTable> {
        let index = self.starts.iter().position(|&s| s == start)?;
        self.truth_tables.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_row_count() {
        assert_eq!(TruthTable::row_count(0, 2), 1);
        assert_eq!(TruthTable::row_count(3, 2), 8);
        assert_eq!(TruthTable::row_count(2, 3), 9);
    }

    #[test]
    fn test_odometer_order() {
        let mut values = TruthTable::input_values_first(2);
        assert_eq!(values, vec![0, 0]);
        let mut seen = vec![values.clone()];
        while TruthTable::input_values_successor(&mut values, 3) {
            seen.push(values.clone());
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(seen[1], vec![0, 1]);
        assert_eq!(seen[3], vec![1, 0]);
        assert_eq!(seen[8], vec![2, 2]);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(values, vec![0, 0]);
    }

    #[test]
    fn test_zero_inputs_single_row() {
        let mut values = TruthTable::input_values_first(0);
        assert!(!TruthTable::input_values_successor(&mut values, 2));
        let table = TruthTable::new(0, 1, 2);
        assert_eq!(table.rows(), 1);
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn test_output_storage() {
        let mut table = TruthTable::new(2, 2, 2);
        assert_eq!(table.rows(), 4);
        table.output_values_mut(&[1, 0]).copy_from_slice(&[1, 1]);
        table.set_row_looped(&[0, 1], true);

        assert_eq!(table.output_values(&[1, 0]), &[1, 1]);
        assert_eq!(table.output_values(&[0, 0]), &[0, 0]);
        assert!(table.row_looped(&[0, 1]));
        assert!(!table.row_looped(&[1, 1]));

        let rows: Vec<_> = table.iter().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], (vec![1, 0], &[1usize, 1][..]));
    }

    #[test]
    #[should_panic]
    fn test_zero_cardinality_panics() {
        TruthTable::new(1, 1, 0);
    }

    #[test]
    fn test_track_table_lookup() {
        let track = TrackTruthTable {
            starts: vec![SegmentId(4), SegmentId(9)],
            truth_tables: vec![TruthTable::new(1, 1, 2), TruthTable::new(1, 2, 2)],
            ..Default::default()
        };
        assert_eq!(track.first_truth_table().map(TruthTable::output_count), Some(1));
        assert_eq!(track.truth_table_for(SegmentId(9)).map(TruthTable::output_count), Some(2));
        assert!(track.truth_table_for(SegmentId(1)).is_none());
    }

    proptest! {
        #[test]
        fn prop_odometer_visits_every_row_once(inputs in 0usize..5, cardinality in 1usize..4) {
            let mut values = TruthTable::input_values_first(inputs);
            let mut count = 1;
            while TruthTable::input_values_successor(&mut values, cardinality) {
                count += 1;
            }
            prop_assert_eq!(count, TruthTable::row_count(inputs, cardinality));
        }
    }
}
