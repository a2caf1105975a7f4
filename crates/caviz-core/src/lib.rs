//! Core types and traits for the caviz stage reader.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the reader and its collaborators: step/node/offset
//! identifiers, local extents, the [`Cell`] capability implemented by each
//! simulation model, the caller-owned [`Grid`], and the error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod error;
pub mod grid;
pub mod id;

pub use cell::Cell;
pub use error::{CellError, StageError};
pub use grid::{Grid, LineSegment};
pub use id::{Extent, FilePosition, NodeId, OffsetRecord, Origin, ParseExtentError, StepId};
