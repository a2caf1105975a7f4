//! Stage configuration, file naming, and read policies.
//!
//! [`StageConfig`] carries what the configuration collaborator supplies
//! (node grid, file base name, data format) plus the reader's explicit
//! policies. [`validate()`](StageConfig::validate) checks structural
//! invariants before a stage is loaded or read.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use caviz_core::{NodeId, StepId};

// ── DataFormat ─────────────────────────────────────────────────────

/// Encoding of the per-node data files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// `"<columns>-<rows>"` header followed by whitespace-separated rows.
    #[default]
    Text,
    /// Raw fixed-size records, extent taken from the index.
    Binary,
}

impl DataFormat {
    /// File extension of data files in this format (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Binary => "bin",
        }
    }
}

// ── OutOfBounds ────────────────────────────────────────────────────

/// What to do when a node's sub-grid reaches past the caller's grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutOfBounds {
    /// Read the data but drop cells outside the grid.
    #[default]
    Skip,
    /// Fail the read before any cell is written.
    Error,
}

// ── LoadPolicy ─────────────────────────────────────────────────────

/// How [`Stage::load_all`](crate::Stage::load_all) treats a node whose
/// index cannot be loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadPolicy {
    /// Return the first node error.
    #[default]
    AbortOnError,
    /// Record the failure and keep loading the remaining nodes.
    ContinueOnError,
}

// ── NodeFiles ──────────────────────────────────────────────────────

/// Per-node file naming: `<dir>/<base><node>.<ext>` for data and
/// `<dir>/<base><node>_index.txt` for the step index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeFiles {
    dir: PathBuf,
    base_name: String,
    format: DataFormat,
}

impl NodeFiles {
    /// Naming rooted at `dir` with the given base name and format.
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>, format: DataFormat) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            format,
        }
    }

    /// Directory holding the node files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Data format the data paths refer to.
    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Path of a node's data file.
    pub fn data_path(&self, node: NodeId) -> PathBuf {
        self.dir.join(format!(
            "{}{}.{}",
            self.base_name,
            node,
            self.format.extension()
        ))
    }

    /// Path of a node's step index file.
    pub fn index_path(&self, node: NodeId) -> PathBuf {
        self.dir.join(format!("{}{}_index.txt", self.base_name, node))
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`StageConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `node_x` or `node_y` is zero.
    ZeroNodes {
        /// Configured node columns.
        node_x: u32,
        /// Configured node rows.
        node_y: u32,
    },
    /// `node_x * node_y` does not fit in a `u32` node id.
    NodeCountOverflow {
        /// Configured node columns.
        node_x: u32,
        /// Configured node rows.
        node_y: u32,
    },
    /// The file base name is empty.
    EmptyBaseName,
    /// The stage was prepared for a different node grid.
    StageShapeMismatch {
        /// Node grid in the configuration.
        configured: (u32, u32),
        /// Node grid of the stage.
        stage: (u32, u32),
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroNodes { node_x, node_y } => {
                write!(f, "node grid {node_x}x{node_y} has no nodes")
            }
            Self::NodeCountOverflow { node_x, node_y } => {
                write!(f, "node grid {node_x}x{node_y} exceeds u32::MAX nodes")
            }
            Self::EmptyBaseName => write!(f, "base_name must not be empty"),
            Self::StageShapeMismatch { configured, stage } => write!(
                f,
                "config node grid {}x{} does not match stage node grid {}x{}",
                configured.0, configured.1, stage.0, stage.1
            ),
        }
    }
}

impl Error for ConfigError {}

// ── StageConfig ────────────────────────────────────────────────────

/// Everything needed to load a stage and read steps from it.
#[derive(Clone, Debug)]
pub struct StageConfig {
    /// Directory holding the per-node data and index files.
    pub data_dir: PathBuf,
    /// File base name; node `n` uses `<base_name><n>.<ext>`.
    pub base_name: String,
    /// Node columns of the distributed run. Default: 1.
    pub node_x: u32,
    /// Node rows of the distributed run. Default: 1.
    pub node_y: u32,
    /// Data file encoding. Default: text.
    pub format: DataFormat,
    /// Fail stage setup when nodes disagree on their step sets.
    /// Default: false (warn and continue).
    pub strict_steps: bool,
    /// Policy for sub-grids reaching past the caller's grid. Default: skip.
    pub out_of_bounds: OutOfBounds,
    /// When set, a read of exactly this step that finds every node empty is
    /// retried once at the previous step. Default: none.
    pub terminal_step_fallback: Option<StepId>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            base_name: String::from("output"),
            node_x: 1,
            node_y: 1,
            format: DataFormat::Text,
            strict_steps: false,
            out_of_bounds: OutOfBounds::Skip,
            terminal_step_fallback: None,
        }
    }
}

impl StageConfig {
    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_x == 0 || self.node_y == 0 {
            return Err(ConfigError::ZeroNodes {
                node_x: self.node_x,
                node_y: self.node_y,
            });
        }
        if self.node_x.checked_mul(self.node_y).is_none() {
            return Err(ConfigError::NodeCountOverflow {
                node_x: self.node_x,
                node_y: self.node_y,
            });
        }
        if self.base_name.is_empty() {
            return Err(ConfigError::EmptyBaseName);
        }
        Ok(())
    }

    /// Total number of nodes, `node_x * node_y`.
    pub fn node_count(&self) -> usize {
        self.node_x as usize * self.node_y as usize
    }

    /// File naming derived from this configuration.
    pub fn files(&self) -> NodeFiles {
        NodeFiles::new(&self.data_dir, &self.base_name, self.format)
    }
}
