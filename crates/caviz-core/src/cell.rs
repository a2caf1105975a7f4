//! The [`Cell`] capability implemented by each simulation model.

use crate::error::CellError;
use crate::id::StepId;

/// One element of the global grid, decoded from a node's data file.
///
/// Each model (debris flow, granular balls, ...) provides its own cell
/// type. The reader is generic over `C: Cell`, so the choice is made once
/// per loaded model rather than per decoded element.
///
/// The reader never mutates a cell in place: it allocates a fresh
/// `C::default()`, optionally calls [`start_step`](Cell::start_step), then
/// decodes exactly one token or record into it before storing it in the
/// grid.
pub trait Cell: Default + Send {
    /// Size in bytes of one binary record.
    ///
    /// Binary data files hold `rows * columns` records of this size,
    /// row-major, with no header.
    const RECORD_SIZE: usize;

    /// Decode one whitespace-delimited token from a text data file.
    fn compose_element(&mut self, token: &str) -> Result<(), CellError>;

    /// Decode one fixed-size record from a binary data file.
    ///
    /// `record.len()` is always [`RECORD_SIZE`](Cell::RECORD_SIZE).
    /// Models without a binary encoding keep the default, which rejects the
    /// record.
    fn decode_record(&mut self, record: &[u8]) -> Result<(), CellError> {
        let _ = record;
        Err(CellError::Unsupported {
            what: "binary records",
        })
    }

    /// Called once per node per read, on the node's local `(0, 0)` cell,
    /// before that cell is decoded.
    fn start_step(&mut self, step: StepId) {
        let _ = step;
    }

    /// Text encoding of a named field, for display layers.
    fn string_encoding(&self, field: &str) -> Option<String>;

    /// Numeric value of a named field, for display layers.
    fn output_value(&self, field: &str) -> Option<f64>;
}
