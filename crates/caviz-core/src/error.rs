//! Error types for the caviz stage reader.
//!
//! [`StageError`] covers the whole pipeline, grouped by where it is raised:
//! index loading, step-set consistency, per-node data access, and the
//! parallel assembly of a step. [`CellError`] is returned by model-specific
//! [`Cell`](crate::Cell) implementations.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::id::{Extent, FilePosition, NodeId, Origin, StepId};

/// Errors from a model's cell decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellError {
    /// The token or record could not be decoded.
    Invalid {
        /// Human-readable description of what went wrong.
        reason: String,
    },
    /// The model has no decoder for this encoding.
    Unsupported {
        /// The encoding that was requested.
        what: &'static str,
    },
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { reason } => write!(f, "invalid cell data: {reason}"),
            Self::Unsupported { what } => write!(f, "cell type does not support {what}"),
        }
    }
}

impl Error for CellError {}

/// Errors raised while building a stage or reading a step from it.
#[derive(Debug)]
pub enum StageError {
    // ── Index loading ───────────────────────────────────────────
    /// A node's index file does not exist.
    IndexFileNotFound {
        /// Node whose index was requested.
        node: NodeId,
        /// Path that was tried.
        path: PathBuf,
    },
    /// A node's index file exists but could not be opened or read.
    IndexFileUnreadable {
        /// Node whose index was requested.
        node: NodeId,
        /// Path that was tried.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// An index line did not match `INT WS INT [WS '(' INT '-' INT ')']`.
    MalformedIndexLine {
        /// Name of the index file.
        file: String,
        /// 1-based line number.
        line_number: usize,
        /// The raw line.
        line: String,
        /// Which part of the grammar failed.
        reason: &'static str,
    },
    /// A node id is outside the stage's node grid.
    NodeOutOfRange {
        /// The offending node.
        node: NodeId,
        /// Number of node slots in the stage.
        node_count: usize,
    },

    // ── Consistency ─────────────────────────────────────────────
    /// No node of the stage has a loaded index.
    EmptyStage,
    /// A node's step set differs from node 0's.
    StepSetMismatch {
        /// The first node found to disagree.
        node: NodeId,
        /// Number of steps known to node 0.
        expected_count: usize,
        /// Number of steps known to `node`.
        actual_count: usize,
    },

    // ── Node data access ────────────────────────────────────────
    /// The node's index has no entry for the step.
    StepNotFoundForNode {
        /// Requested step.
        step: StepId,
        /// Node without an entry.
        node: NodeId,
    },
    /// The node's data file could not be opened.
    DataFileUnreadable {
        /// Node whose data file was opened.
        node: NodeId,
        /// Path that was tried.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// Seeking to the recorded offset failed.
    SeekFailed {
        /// Node whose data file was read.
        node: NodeId,
        /// Offset recorded in the index.
        position: FilePosition,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// A text record did not start with a `"<columns>-<rows>"` header.
    InvalidExtentHeader {
        /// Node whose data file was read.
        node: NodeId,
        /// Requested step.
        step: StepId,
        /// The header line as read (without line terminator).
        header: String,
    },
    /// A binary read was requested but the index carries no extent.
    MissingBinaryExtent {
        /// Node whose record lacks an extent.
        node: NodeId,
        /// Requested step.
        step: StepId,
    },
    /// A record ended before `rows × columns` cells were read.
    TruncatedRecord {
        /// Node whose data file was read.
        node: NodeId,
        /// Requested step.
        step: StepId,
        /// Local row at which data ran out.
        row: u32,
        /// Human-readable description of what was missing.
        detail: String,
    },
    /// The model's decoder rejected a token or record.
    CellDecode {
        /// Node whose data file was read.
        node: NodeId,
        /// Local row of the cell.
        row: u32,
        /// Local column of the cell.
        column: u32,
        /// The decoder's error.
        source: CellError,
    },

    // ── Assembly ────────────────────────────────────────────────
    /// A node's sub-grid extends past the caller's grid and the
    /// out-of-bounds policy is `Error`.
    RegionOutOfBounds {
        /// The offending node.
        node: NodeId,
        /// Computed origin of its sub-grid.
        origin: Origin,
        /// Its local extent.
        extent: Extent,
        /// Row count of the caller's grid.
        grid_rows: usize,
        /// Column count of the caller's grid.
        grid_columns: usize,
    },
    /// Two nodes' sub-grids cover the same global cell.
    OverlappingNodeRegions {
        /// The node placed first.
        first: NodeId,
        /// The node whose region collides with it.
        second: NodeId,
        /// A global row on which they collide.
        row: usize,
    },
    /// A node's worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Node the worker was meant for.
        node: NodeId,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// A node's worker thread panicked.
    WorkerPanicked,
    /// A node's read failed inside its worker.
    NodeReadFailure {
        /// Node whose read failed.
        node: NodeId,
        /// What went wrong.
        source: Box<StageError>,
    },
}

impl StageError {
    /// Wrap an error raised inside a node worker.
    pub fn node_failure(node: NodeId, source: StageError) -> Self {
        Self::NodeReadFailure {
            node,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through [`NodeReadFailure`](Self::NodeReadFailure).
    pub fn root(&self) -> &StageError {
        match self {
            Self::NodeReadFailure { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexFileNotFound { node, path } => {
                write!(f, "node {node}: index file {} not found", path.display())
            }
            Self::IndexFileUnreadable { node, path, source } => {
                write!(
                    f,
                    "node {node}: index file {} unreadable: {source}",
                    path.display()
                )
            }
            Self::MalformedIndexLine {
                file,
                line_number,
                line,
                reason,
            } => write!(f, "{file}:{line_number}: {reason}: {line:?}"),
            Self::NodeOutOfRange { node, node_count } => {
                write!(f, "node {node} out of range (stage has {node_count} nodes)")
            }
            Self::EmptyStage => write!(f, "stage has no loaded nodes"),
            Self::StepSetMismatch {
                node,
                expected_count,
                actual_count,
            } => write!(
                f,
                "node {node} step set differs from node 0 \
                 (expected {expected_count} steps, found {actual_count})"
            ),
            Self::StepNotFoundForNode { step, node } => {
                write!(f, "node {node} has no index entry for step {step}")
            }
            Self::DataFileUnreadable { node, path, source } => {
                write!(
                    f,
                    "node {node}: data file {} unreadable: {source}",
                    path.display()
                )
            }
            Self::SeekFailed {
                node,
                position,
                source,
            } => write!(f, "node {node}: seek to offset {position} failed: {source}"),
            Self::InvalidExtentHeader { node, step, header } => write!(
                f,
                "node {node}, step {step}: invalid extent header {header:?} \
                 (expected \"<columns>-<rows>\")"
            ),
            Self::MissingBinaryExtent { node, step } => write!(
                f,
                "node {node}, step {step}: binary read needs an extent in the index"
            ),
            Self::TruncatedRecord {
                node,
                step,
                row,
                detail,
            } => write!(
                f,
                "node {node}, step {step}: record truncated at row {row}: {detail}"
            ),
            Self::CellDecode {
                node,
                row,
                column,
                source,
            } => write!(f, "node {node}: cell ({row}, {column}): {source}"),
            Self::RegionOutOfBounds {
                node,
                origin,
                extent,
                grid_rows,
                grid_columns,
            } => write!(
                f,
                "node {node}: sub-grid {extent} at ({}, {}) exceeds grid \
                 of {grid_rows} rows x {grid_columns} columns",
                origin.x, origin.y
            ),
            Self::OverlappingNodeRegions { first, second, row } => write!(
                f,
                "nodes {first} and {second} overlap on global row {row}"
            ),
            Self::ThreadSpawnFailed { node, source } => {
                write!(f, "node {node}: worker thread spawn failed: {source}")
            }
            Self::WorkerPanicked => write!(f, "worker thread panicked"),
            Self::NodeReadFailure { node, source } => {
                write!(f, "read of node {node} failed: {source}")
            }
        }
    }
}

impl Error for StageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IndexFileUnreadable { source, .. }
            | Self::DataFileUnreadable { source, .. }
            | Self::SeekFailed { source, .. }
            | Self::ThreadSpawnFailed { source, .. } => Some(source),
            Self::CellDecode { source, .. } => Some(source),
            Self::NodeReadFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
