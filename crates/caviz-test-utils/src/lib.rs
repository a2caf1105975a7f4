//! Test cells and on-disk run fixtures for caviz development.
//!
//! [`SentinelCell`] decodes tokens that name the node and local position
//! they were written for, so a test can check exactly where every cell of
//! the global grid came from. [`fixtures`] writes per-node data and index
//! files in the formats the reader consumes.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use caviz_core::{Cell, CellError, StepId};

/// A cell that records which node, row and column produced it.
///
/// Text token: `"<node>:<row>:<column>"`. Binary record: three
/// little-endian `u32`s in the same order. A default cell has
/// `decoded == false`, which marks grid positions no node wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentinelCell {
    pub node: u32,
    pub row: u32,
    pub column: u32,
    pub decoded: bool,
    /// Set by `start_step`, so only a node's local `(0, 0)` carries it.
    pub started: Option<StepId>,
}

impl SentinelCell {
    /// The token that decodes to `(node, row, column)`.
    pub fn token(node: u32, row: u32, column: u32) -> String {
        format!("{node}:{row}:{column}")
    }

    /// The binary record that decodes to `(node, row, column)`.
    pub fn record(node: u32, row: u32, column: u32) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[0..4].copy_from_slice(&node.to_le_bytes());
        out[4..8].copy_from_slice(&row.to_le_bytes());
        out[8..12].copy_from_slice(&column.to_le_bytes());
        out
    }

    /// Whether this cell was decoded from `(node, row, column)`.
    pub fn is(&self, node: u32, row: u32, column: u32) -> bool {
        self.decoded && (self.node, self.row, self.column) == (node, row, column)
    }
}

impl Cell for SentinelCell {
    const RECORD_SIZE: usize = 12;

    fn compose_element(&mut self, token: &str) -> Result<(), CellError> {
        let invalid = || CellError::Invalid {
            reason: format!("not a sentinel token: {token:?}"),
        };
        let mut parts = token.split(':').map(|p| p.parse::<u32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(node)), Some(Ok(row)), Some(Ok(column)), None) => {
                self.node = node;
                self.row = row;
                self.column = column;
                self.decoded = true;
                Ok(())
            }
            _ => Err(invalid()),
        }
    }

    fn decode_record(&mut self, record: &[u8]) -> Result<(), CellError> {
        let word = |i: usize| -> Result<u32, CellError> {
            record
                .get(i * 4..i * 4 + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_le_bytes)
                .ok_or_else(|| CellError::Invalid {
                    reason: format!("record of {} bytes", record.len()),
                })
        };
        self.node = word(0)?;
        self.row = word(1)?;
        self.column = word(2)?;
        self.decoded = true;
        Ok(())
    }

    fn start_step(&mut self, step: StepId) {
        self.started = Some(step);
    }

    fn string_encoding(&self, field: &str) -> Option<String> {
        match field {
            "origin" => Some(Self::token(self.node, self.row, self.column)),
            _ => None,
        }
    }

    fn output_value(&self, field: &str) -> Option<f64> {
        match field {
            "node" => Some(f64::from(self.node)),
            "row" => Some(f64::from(self.row)),
            "column" => Some(f64::from(self.column)),
            _ => None,
        }
    }
}

/// A text-only cell holding one number.
///
/// Keeps the default `decode_record`, so binary reads fail with
/// [`CellError::Unsupported`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScalarCell(pub f64);

impl Cell for ScalarCell {
    const RECORD_SIZE: usize = 8;

    fn compose_element(&mut self, token: &str) -> Result<(), CellError> {
        self.0 = token.parse().map_err(|_| CellError::Invalid {
            reason: format!("not a number: {token:?}"),
        })?;
        Ok(())
    }

    fn string_encoding(&self, field: &str) -> Option<String> {
        (field == "value").then(|| self.0.to_string())
    }

    fn output_value(&self, field: &str) -> Option<f64> {
        (field == "value").then_some(self.0)
    }
}
