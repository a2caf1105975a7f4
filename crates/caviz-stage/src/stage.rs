//! The stage: one step table per node, plus the step-set consistency check.
//!
//! A stage is prepared for an `node_x × node_y` run, filled by one index
//! load per node, queried many times, and cleared when the configuration
//! or model changes. Tables are read-only once loaded, so a `&Stage` can be
//! shared by any number of concurrent readers.

use std::path::Path;

use caviz_core::{NodeId, OffsetRecord, StageError, StepId};
use tracing::{info, warn};

use crate::config::{LoadPolicy, StageConfig};
use crate::index::{load_index, DuplicateStep, IndexReport};
use crate::table::StepOffsetTable;

/// A node whose step set differs from node 0's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepSetMismatch {
    /// The disagreeing node.
    pub node: NodeId,
    /// Number of steps known to node 0.
    pub expected_count: usize,
    /// Number of steps known to `node` (0 if it was never loaded).
    pub actual_count: usize,
}

/// Result of comparing every node's step set with node 0's.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Node 0's steps, ascending.
    pub reference: Vec<StepId>,
    /// Every node that disagrees with the reference, in node order.
    pub mismatches: Vec<StepSetMismatch>,
}

impl ConsistencyReport {
    /// Whether all nodes agree.
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcome of [`Stage::load_all`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Nodes whose index loaded.
    pub loaded: Vec<NodeId>,
    /// Duplicate-step warnings from all loaded nodes.
    pub duplicates: Vec<DuplicateStep>,
    /// Nodes that failed, with their error (only under
    /// [`LoadPolicy::ContinueOnError`]).
    pub failures: Vec<(NodeId, StageError)>,
}

/// Per-node step tables for one loaded configuration.
#[derive(Clone, Debug, Default)]
pub struct Stage {
    node_x: u32,
    node_y: u32,
    tables: Vec<Option<StepOffsetTable>>,
}

impl Stage {
    /// Create an empty stage with one slot per node.
    ///
    /// Panics if `node_x * node_y` overflows `usize`.
    pub fn prepare(node_x: u32, node_y: u32) -> Self {
        let count = node_x as usize * node_y as usize;
        Self {
            node_x,
            node_y,
            tables: vec![None; count],
        }
    }

    /// Drop every table and forget the node grid.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.node_x = 0;
        self.node_y = 0;
    }

    /// Node columns.
    pub fn node_x(&self) -> u32 {
        self.node_x
    }

    /// Node rows.
    pub fn node_y(&self) -> u32 {
        self.node_y
    }

    /// Number of node slots.
    pub fn node_count(&self) -> usize {
        self.tables.len()
    }

    /// Nodes that currently hold a table.
    pub fn loaded_nodes(&self) -> Vec<NodeId> {
        self.tables
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    fn check_node(&self, node: NodeId) -> Result<(), StageError> {
        if node.index() < self.tables.len() {
            Ok(())
        } else {
            Err(StageError::NodeOutOfRange {
                node,
                node_count: self.tables.len(),
            })
        }
    }

    /// Load one node's index file into its slot.
    ///
    /// On error the node's previous table (if any) is left untouched and
    /// other nodes are unaffected; the caller decides whether to continue.
    ///
    /// Returns the duplicate-step warnings raised while parsing.
    pub fn load_node(
        &mut self,
        node: NodeId,
        path: &Path,
    ) -> Result<Vec<DuplicateStep>, StageError> {
        self.check_node(node)?;
        let IndexReport {
            table, duplicates, ..
        } = load_index(node, path)?;
        self.tables[node.index()] = Some(table);
        Ok(duplicates)
    }

    /// Install an already-built table.
    pub fn install_table(
        &mut self,
        node: NodeId,
        table: StepOffsetTable,
    ) -> Result<(), StageError> {
        self.check_node(node)?;
        self.tables[node.index()] = Some(table);
        Ok(())
    }

    /// Load every node's index using the configuration's file naming.
    pub fn load_all(
        &mut self,
        config: &StageConfig,
        policy: LoadPolicy,
    ) -> Result<LoadReport, StageError> {
        let files = config.files();
        let mut report = LoadReport::default();
        for i in 0..self.tables.len() {
            let node = NodeId(i as u32);
            match self.load_node(node, &files.index_path(node)) {
                Ok(duplicates) => {
                    report.loaded.push(node);
                    report.duplicates.extend(duplicates);
                }
                Err(e) => match policy {
                    LoadPolicy::AbortOnError => return Err(e),
                    LoadPolicy::ContinueOnError => {
                        warn!(node = node.0, error = %e, "node index failed to load");
                        report.failures.push((node, e));
                    }
                },
            }
        }
        info!(
            nodes = self.tables.len(),
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            duplicates = report.duplicates.len(),
            "stage loaded"
        );
        Ok(report)
    }

    /// A node's table, if loaded.
    pub fn table(&self, node: NodeId) -> Option<&StepOffsetTable> {
        self.tables.get(node.index()).and_then(Option::as_ref)
    }

    /// The offset record for `(step, node)`.
    pub fn record(&self, step: StepId, node: NodeId) -> Result<OffsetRecord, StageError> {
        self.check_node(node)?;
        self.table(node)
            .and_then(|t| t.get(step))
            .copied()
            .ok_or(StageError::StepNotFoundForNode { step, node })
    }

    /// Compare every node's step set against node 0's.
    pub fn check_consistency(&self) -> ConsistencyReport {
        let reference = self
            .table(NodeId(0))
            .map(StepOffsetTable::sorted_steps)
            .unwrap_or_default();
        let mut mismatches = Vec::new();
        for (i, slot) in self.tables.iter().enumerate().skip(1) {
            let steps = slot
                .as_ref()
                .map(StepOffsetTable::sorted_steps)
                .unwrap_or_default();
            if steps != reference {
                mismatches.push(StepSetMismatch {
                    node: NodeId(i as u32),
                    expected_count: reference.len(),
                    actual_count: steps.len(),
                });
            }
        }
        ConsistencyReport {
            reference,
            mismatches,
        }
    }

    /// Node 0's steps, ascending, after checking every node agrees.
    ///
    /// In lenient mode disagreements are logged and the reference list is
    /// still returned, so a returned step may be missing on some nodes.
    ///
    /// # Errors
    ///
    /// Strict mode only: [`StageError::EmptyStage`] if no node is loaded,
    /// [`StageError::StepSetMismatch`] for the first disagreeing node.
    pub fn available_steps(&self, strict: bool) -> Result<Vec<StepId>, StageError> {
        if self.tables.iter().all(Option::is_none) {
            if strict {
                return Err(StageError::EmptyStage);
            }
            warn!("stage has no loaded nodes, no steps available");
            return Ok(Vec::new());
        }

        let report = self.check_consistency();
        for m in &report.mismatches {
            if strict {
                return Err(StageError::StepSetMismatch {
                    node: m.node,
                    expected_count: m.expected_count,
                    actual_count: m.actual_count,
                });
            }
            warn!(
                node = m.node.0,
                expected = m.expected_count,
                actual = m.actual_count,
                "node step set differs from node 0"
            );
        }
        Ok(report.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(steps: &[i64]) -> StepOffsetTable {
        steps
            .iter()
            .map(|&s| (StepId(s), OffsetRecord::at(s as u64 * 10)))
            .collect()
    }

    #[test]
    fn prepare_sizes_slots() {
        let stage = Stage::prepare(3, 2);
        assert_eq!(stage.node_count(), 6);
        assert!(stage.loaded_nodes().is_empty());
    }

    #[test]
    fn empty_stage_lenient_is_empty_list() {
        let stage = Stage::prepare(2, 2);
        assert_eq!(stage.available_steps(false).unwrap(), Vec::<StepId>::new());
    }

    #[test]
    fn empty_stage_strict_fails() {
        let stage = Stage::prepare(2, 2);
        assert!(matches!(
            stage.available_steps(true),
            Err(StageError::EmptyStage)
        ));
    }

    #[test]
    fn mismatch_lenient_returns_reference() {
        let mut stage = Stage::prepare(2, 1);
        stage.install_table(NodeId(0), table(&[0, 1, 2])).unwrap();
        stage.install_table(NodeId(1), table(&[0, 1])).unwrap();

        let steps = stage.available_steps(false).unwrap();
        assert_eq!(steps, vec![StepId(0), StepId(1), StepId(2)]);

        let report = stage.check_consistency();
        assert_eq!(
            report.mismatches,
            vec![StepSetMismatch {
                node: NodeId(1),
                expected_count: 3,
                actual_count: 2,
            }]
        );
    }

    #[test]
    fn mismatch_strict_fails_with_counts() {
        let mut stage = Stage::prepare(2, 1);
        stage.install_table(NodeId(0), table(&[0, 1, 2])).unwrap();
        stage.install_table(NodeId(1), table(&[0, 1])).unwrap();
        match stage.available_steps(true) {
            Err(StageError::StepSetMismatch {
                node,
                expected_count,
                actual_count,
            }) => {
                assert_eq!(node, NodeId(1));
                assert_eq!(expected_count, 3);
                assert_eq!(actual_count, 2);
            }
            other => panic!("expected StepSetMismatch, got {other:?}"),
        }
    }

    #[test]
    fn same_size_different_members_is_mismatch() {
        let mut stage = Stage::prepare(2, 1);
        stage.install_table(NodeId(0), table(&[0, 1])).unwrap();
        stage.install_table(NodeId(1), table(&[0, 2])).unwrap();
        assert!(stage.available_steps(true).is_err());
        assert_eq!(stage.check_consistency().mismatches.len(), 1);
    }

    #[test]
    fn lenient_scan_reports_every_bad_node() {
        let mut stage = Stage::prepare(3, 1);
        stage.install_table(NodeId(0), table(&[0, 1])).unwrap();
        stage.install_table(NodeId(1), table(&[0])).unwrap();
        // node 2 never loaded
        let report = stage.check_consistency();
        let nodes: Vec<_> = report.mismatches.iter().map(|m| m.node).collect();
        assert_eq!(nodes, vec![NodeId(1), NodeId(2)]);
        assert_eq!(report.mismatches[1].actual_count, 0);
    }

    #[test]
    fn consistent_stage_strict_succeeds() {
        let mut stage = Stage::prepare(2, 2);
        for n in 0..4 {
            stage.install_table(NodeId(n), table(&[5, 1, 3])).unwrap();
        }
        assert_eq!(
            stage.available_steps(true).unwrap(),
            vec![StepId(1), StepId(3), StepId(5)]
        );
    }

    #[test]
    fn record_lookup_errors() {
        let mut stage = Stage::prepare(1, 1);
        stage.install_table(NodeId(0), table(&[4])).unwrap();
        assert_eq!(stage.record(StepId(4), NodeId(0)).unwrap(), OffsetRecord::at(40));
        assert!(matches!(
            stage.record(StepId(5), NodeId(0)),
            Err(StageError::StepNotFoundForNode { .. })
        ));
        assert!(matches!(
            stage.record(StepId(4), NodeId(1)),
            Err(StageError::NodeOutOfRange { node_count: 1, .. })
        ));
    }

    #[test]
    fn clear_resets_stage() {
        let mut stage = Stage::prepare(2, 1);
        stage.install_table(NodeId(0), table(&[0])).unwrap();
        stage.clear();
        assert_eq!(stage.node_count(), 0);
        assert!(matches!(
            stage.available_steps(true),
            Err(StageError::EmptyStage)
        ));
    }
}
