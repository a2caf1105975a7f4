//! caviz: reads the step-indexed output of distributed cellular-automaton
//! runs back into one global grid.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the caviz sub-crates. For most users, adding `caviz` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use caviz::prelude::*;
//!
//! // A model whose cells are single integers.
//! #[derive(Default)]
//! struct Count(u32);
//!
//! impl Cell for Count {
//!     const RECORD_SIZE: usize = 4;
//!     fn compose_element(&mut self, token: &str) -> Result<(), CellError> {
//!         self.0 = token.parse().map_err(|_| CellError::Invalid { reason: token.into() })?;
//!         Ok(())
//!     }
//!     fn string_encoding(&self, _field: &str) -> Option<String> { Some(self.0.to_string()) }
//!     fn output_value(&self, _field: &str) -> Option<f64> { Some(f64::from(self.0)) }
//! }
//!
//! // One node, one step: a 2x1 sub-grid at offset 0.
//! let dir = std::env::temp_dir().join(format!("caviz-doc-{}", std::process::id()));
//! std::fs::create_dir_all(&dir).unwrap();
//! std::fs::write(dir.join("count0.txt"), "2-1\n7 9\n").unwrap();
//! std::fs::write(dir.join("count0_index.txt"), "0 0\n").unwrap();
//!
//! let config = StageConfig {
//!     data_dir: dir.clone(),
//!     base_name: "count".into(),
//!     ..StageConfig::default()
//! };
//! let mut stage = Stage::prepare(1, 1);
//! stage.load_all(&config, LoadPolicy::AbortOnError).unwrap();
//!
//! let reader = StageReader::new(&stage, &config).unwrap();
//! let mut grid: Grid<Count> = Grid::new(1, 2);
//! let frame = reader.read_step(StepId(0), &mut grid).unwrap();
//! assert_eq!(frame.extents, vec![Extent::new(2, 1)]);
//! assert_eq!(grid.get(0, 1).map(|c| c.0), Some(9));
//! # std::fs::remove_dir_all(&dir).unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `caviz-core` | IDs, extents, `Cell`, `Grid`, errors |
//! | [`stage`] | `caviz-stage` | Index loading, stage, layout, parallel assembly |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, the cell trait, and errors (`caviz-core`).
///
/// Contains step/node/offset identifiers, [`types::Extent`],
/// [`types::Grid`], and [`types::StageError`].
pub use caviz_core as types;

/// Stage loading and step assembly (`caviz-stage`).
///
/// Load per-node indexes into a [`stage::Stage`], then read steps with a
/// [`stage::StageReader`].
pub use caviz_stage as stage;

/// Common imports for typical caviz usage.
///
/// ```rust
/// use caviz::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use caviz_core::{
        Cell, Extent, Grid, LineSegment, NodeId, OffsetRecord, Origin, StepId,
    };

    // Errors
    pub use caviz_core::{CellError, StageError};
    pub use caviz_stage::ConfigError;

    // Stage
    pub use caviz_stage::{
        DataFormat, LoadPolicy, OutOfBounds, Stage, StageConfig, StageReader, StepFrame,
    };
}
