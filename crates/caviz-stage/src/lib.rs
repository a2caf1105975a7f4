//! Distributed, step-indexed stage reader for cellular-automaton output.
//!
//! A simulation run on an `node_x × node_y` grid of compute nodes leaves
//! one data file and one index file per node. This crate loads the index
//! files into a [`Stage`], checks that every node recorded the same steps,
//! and reads any step back into a single caller-owned global grid, one
//! worker thread per node.
//!
//! ```no_run
//! use caviz_core::{Grid, StepId};
//! use caviz_stage::{LoadPolicy, Stage, StageConfig, StageReader};
//! # #[derive(Default)] struct Density(f64);
//! # impl caviz_core::Cell for Density {
//! #     const RECORD_SIZE: usize = 8;
//! #     fn compose_element(&mut self, t: &str) -> Result<(), caviz_core::CellError> {
//! #         self.0 = t.parse().map_err(|_| caviz_core::CellError::Invalid { reason: t.into() })?;
//! #         Ok(())
//! #     }
//! #     fn string_encoding(&self, _: &str) -> Option<String> { None }
//! #     fn output_value(&self, _: &str) -> Option<f64> { Some(self.0) }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StageConfig {
//!     data_dir: "runs/lattice".into(),
//!     base_name: "density".into(),
//!     node_x: 2,
//!     node_y: 2,
//!     ..StageConfig::default()
//! };
//! let mut stage = Stage::prepare(config.node_x, config.node_y);
//! stage.load_all(&config, LoadPolicy::AbortOnError)?;
//!
//! let reader = StageReader::new(&stage, &config)?;
//! let mut grid: Grid<Density> = Grid::new(256, 256);
//! for step in reader.available_steps()? {
//!     let frame = reader.read_step(step, &mut grid)?;
//!     println!("step {} from {} nodes", frame.step, frame.extents.len());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod index;
pub mod layout;
pub mod node;
pub mod region;
pub mod stage;
pub mod table;

pub use assemble::{StageReader, StepFrame};
pub use config::{ConfigError, DataFormat, LoadPolicy, NodeFiles, OutOfBounds, StageConfig};
pub use index::{load_index, parse_index, DuplicateStep, IndexReport};
pub use layout::{compute_origin, compute_origins, NodeBoundaries};
pub use node::NodeStream;
pub use stage::{ConsistencyReport, LoadReport, Stage, StepSetMismatch};
pub use table::{InsertOutcome, StepOffsetTable};
