//! Per-node step index parsing.
//!
//! An index file has one line per recorded step:
//!
//! ```text
//! <step> <position>                     legacy
//! <step> <position> (<columns>-<rows>)  extended
//! ```
//!
//! Blank lines are skipped. Anything else that does not match is a hard
//! error. A step seen twice keeps its first record and is reported as a
//! [`DuplicateStep`].

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use caviz_core::{Extent, NodeId, OffsetRecord, StageError, StepId};
use tracing::{debug, warn};

use crate::table::{InsertOutcome, StepOffsetTable};

/// A step that appeared more than once in an index file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuplicateStep {
    /// Node whose index held the duplicate.
    pub node: NodeId,
    /// The repeated step.
    pub step: StepId,
    /// The record that stays in the table (first occurrence).
    pub kept: OffsetRecord,
    /// The record that was dropped.
    pub ignored: OffsetRecord,
    /// 1-based line number of the dropped occurrence.
    pub line_number: usize,
}

/// Outcome of loading one node's index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexReport {
    /// Node the index belongs to.
    pub node: NodeId,
    /// The parsed table.
    pub table: StepOffsetTable,
    /// Non-fatal duplicate warnings, in file order.
    pub duplicates: Vec<DuplicateStep>,
}

/// Load a node's index file from disk.
///
/// # Errors
///
/// [`StageError::IndexFileNotFound`] if the file does not exist,
/// [`StageError::IndexFileUnreadable`] if it cannot be opened or read, and
/// [`StageError::MalformedIndexLine`] for the first line that does not
/// match the grammar.
pub fn load_index(node: NodeId, path: &Path) -> Result<IndexReport, StageError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            StageError::IndexFileNotFound {
                node,
                path: path.to_path_buf(),
            }
        } else {
            StageError::IndexFileUnreadable {
                node,
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_index(node, &name, BufReader::new(file)).map_err(|e| match e {
        StageError::IndexFileUnreadable { node, source, .. } => StageError::IndexFileUnreadable {
            node,
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parse an index from any buffered source.
///
/// `file_name` is only used in error messages. Read errors are reported as
/// [`StageError::IndexFileUnreadable`] with `file_name` as the path.
pub fn parse_index(
    node: NodeId,
    file_name: &str,
    reader: impl BufRead,
) -> Result<IndexReport, StageError> {
    let mut table = StepOffsetTable::new();
    let mut duplicates = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_number = i + 1;
        let line = line.map_err(|source| StageError::IndexFileUnreadable {
            node,
            path: file_name.into(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let (step, record) = parse_line(&line).map_err(|reason| StageError::MalformedIndexLine {
            file: file_name.to_string(),
            line_number,
            line: line.clone(),
            reason,
        })?;

        if let InsertOutcome::Duplicate { kept, ignored } = table.insert(step, record) {
            warn!(
                node = node.0,
                step = step.0,
                kept = kept.position.0,
                ignored = ignored.position.0,
                file = file_name,
                line = line_number,
                "duplicate step in index, keeping first entry"
            );
            duplicates.push(DuplicateStep {
                node,
                step,
                kept,
                ignored,
                line_number,
            });
        }
    }

    debug!(
        node = node.0,
        steps = table.len(),
        duplicates = duplicates.len(),
        file = file_name,
        "index parsed"
    );
    Ok(IndexReport {
        node,
        table,
        duplicates,
    })
}

/// Parse one non-blank index line.
fn parse_line(line: &str) -> Result<(StepId, OffsetRecord), &'static str> {
    let mut tokens = line.split_whitespace();
    let step = tokens
        .next()
        .and_then(|t| t.parse::<i64>().ok())
        .ok_or("expected integer step")?;
    let position = tokens
        .next()
        .and_then(|t| t.parse::<i64>().ok())
        .ok_or("expected integer position")?;
    let position = u64::try_from(position).map_err(|_| "negative position")?;

    let extent = match tokens.next() {
        None => None,
        Some(annotation) => Some(parse_annotation(annotation).ok_or("expected (<columns>-<rows>)")?),
    };
    if tokens.next().is_some() {
        return Err("unexpected trailing tokens");
    }

    Ok((
        StepId(step),
        OffsetRecord {
            position: position.into(),
            extent,
        },
    ))
}

/// Parse the `(<columns>-<rows>)` annotation of an extended line.
fn parse_annotation(token: &str) -> Option<Extent> {
    let inner = token.strip_prefix('(')?.strip_suffix(')')?;
    inner.parse().ok()
}
