//! Per-node mapping from step to data-file offset.

use caviz_core::{OffsetRecord, StepId};
use indexmap::IndexMap;

/// Result of [`StepOffsetTable::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The step was new and is now in the table.
    Inserted,
    /// The step was already present; the existing record was kept.
    Duplicate {
        /// The record already in the table.
        kept: OffsetRecord,
        /// The record that was rejected.
        ignored: OffsetRecord,
    },
}

/// One node's step → [`OffsetRecord`] table.
///
/// Keeps steps in the order they were inserted (the index file order);
/// [`sorted_steps`](Self::sorted_steps) gives the ascending view used for
/// consistency checks. The first record inserted for a step wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepOffsetTable {
    entries: IndexMap<StepId, OffsetRecord>,
}

impl StepOffsetTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless the step is already present.
    pub fn insert(&mut self, step: StepId, record: OffsetRecord) -> InsertOutcome {
        match self.entries.get(&step) {
            Some(&kept) => InsertOutcome::Duplicate {
                kept,
                ignored: record,
            },
            None => {
                self.entries.insert(step, record);
                InsertOutcome::Inserted
            }
        }
    }

    /// Record for a step, if present.
    pub fn get(&self, step: StepId) -> Option<&OffsetRecord> {
        self.entries.get(&step)
    }

    /// Whether the table has a record for `step`.
    pub fn contains(&self, step: StepId) -> bool {
        self.entries.contains_key(&step)
    }

    /// Number of distinct steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no steps.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All steps, ascending.
    pub fn sorted_steps(&self) -> Vec<StepId> {
        let mut steps: Vec<StepId> = self.entries.keys().copied().collect();
        steps.sort_unstable();
        steps
    }

    /// Smallest recorded step.
    pub fn first_step(&self) -> Option<StepId> {
        self.entries.keys().min().copied()
    }

    /// Largest recorded step.
    pub fn last_step(&self) -> Option<StepId> {
        self.entries.keys().max().copied()
    }

    /// Iterate `(step, record)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &OffsetRecord)> {
        self.entries.iter().map(|(&step, record)| (step, record))
    }
}

impl FromIterator<(StepId, OffsetRecord)> for StepOffsetTable {
    fn from_iter<I: IntoIterator<Item = (StepId, OffsetRecord)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (step, record) in iter {
            table.insert(step, record);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caviz_core::Extent;

    #[test]
    fn first_insert_wins() {
        let mut table = StepOffsetTable::new();
        assert_eq!(
            table.insert(StepId(5), OffsetRecord::at(100)),
            InsertOutcome::Inserted
        );
        let outcome = table.insert(StepId(5), OffsetRecord::at(900));
        assert_eq!(
            outcome,
            InsertOutcome::Duplicate {
                kept: OffsetRecord::at(100),
                ignored: OffsetRecord::at(900),
            }
        );
        assert_eq!(table.get(StepId(5)), Some(&OffsetRecord::at(100)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sorted_steps_ignores_insertion_order() {
        let table: StepOffsetTable = [30, 10, 20]
            .into_iter()
            .map(|s| (StepId(s), OffsetRecord::at(s as u64)))
            .collect();
        assert_eq!(table.sorted_steps(), vec![StepId(10), StepId(20), StepId(30)]);
        assert_eq!(table.first_step(), Some(StepId(10)));
        assert_eq!(table.last_step(), Some(StepId(30)));
        let order: Vec<_> = table.iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec![StepId(30), StepId(10), StepId(20)]);
    }

    #[test]
    fn extent_is_kept_with_record() {
        let mut table = StepOffsetTable::new();
        table.insert(StepId(1), OffsetRecord::with_extent(64, Extent::new(4, 2)));
        assert_eq!(
            table.get(StepId(1)).and_then(|r| r.extent),
            Some(Extent::new(4, 2))
        );
        assert!(table.contains(StepId(1)));
        assert!(!table.contains(StepId(2)));
    }

    #[test]
    fn empty_table_has_no_bounds() {
        let table = StepOffsetTable::new();
        assert!(table.is_empty());
        assert_eq!(table.first_step(), None);
        assert!(table.sorted_steps().is_empty());
    }
}
