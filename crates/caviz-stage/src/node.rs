//! Opening one node's data file at a step's recorded offset.
//!
//! [`NodeStream`] wraps a `BufReader<File>` positioned at the first data
//! record of a step. Text files repeat the local extent as a
//! `"<columns>-<rows>"` header line at the offset, which is consumed here;
//! binary files have no header and take the extent from the index.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use caviz_core::{Extent, NodeId, StageError, StepId};
use tracing::trace;

use crate::config::{DataFormat, NodeFiles};
use crate::stage::Stage;

/// A node's data file, positioned at the first record of one step.
#[derive(Debug)]
pub struct NodeStream {
    node: NodeId,
    step: StepId,
    extent: Extent,
    format: DataFormat,
    path: PathBuf,
    reader: BufReader<File>,
}

impl NodeStream {
    /// Node the stream belongs to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Step the stream is positioned at.
    pub fn step(&self) -> StepId {
        self.step
    }

    /// Local extent of the node at this step.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Encoding of the data file.
    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying reader, at the first unread data byte.
    pub fn reader(&mut self) -> &mut BufReader<File> {
        &mut self.reader
    }
}

impl Stage {
    /// Open `node`'s data file at the offset recorded for `step`.
    ///
    /// The data format comes from `files`. The returned stream is positioned
    /// at the first data record and carries the node's extent at `step`.
    ///
    /// # Errors
    ///
    /// [`StageError::StepNotFoundForNode`] if the node has no record for
    /// `step`, [`StageError::DataFileUnreadable`] if the file cannot be
    /// opened, [`StageError::SeekFailed`] if seeking fails,
    /// [`StageError::InvalidExtentHeader`] for a bad text header, and
    /// [`StageError::MissingBinaryExtent`] for a binary read whose index
    /// entry has no extent.
    pub fn open_node_stream(
        &self,
        step: StepId,
        node: NodeId,
        files: &NodeFiles,
    ) -> Result<NodeStream, StageError> {
        let record = self.record(step, node)?;
        let format = files.format();

        let path = files.data_path(node);
        let file = File::open(&path).map_err(|source| StageError::DataFileUnreadable {
            node,
            path: path.clone(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(record.position.0))
            .map_err(|source| StageError::SeekFailed {
                node,
                position: record.position,
                source,
            })?;

        let extent = match (format, record.extent) {
            (DataFormat::Text, _) => read_header(&mut reader, node, step, &path)?,
            (DataFormat::Binary, Some(extent)) => extent,
            (DataFormat::Binary, None) => {
                return Err(StageError::MissingBinaryExtent { node, step })
            }
        };

        trace!(
            node = node.0,
            step = step.0,
            position = record.position.0,
            %extent,
            "node stream opened"
        );
        Ok(NodeStream {
            node,
            step,
            extent,
            format,
            path,
            reader,
        })
    }

    /// Every node's stream at `step`, opened one node after another.
    ///
    /// Fails on the first node that cannot be opened.
    pub fn open_node_streams(
        &self,
        step: StepId,
        files: &NodeFiles,
    ) -> Result<Vec<NodeStream>, StageError> {
        (0..self.node_count())
            .map(|n| self.open_node_stream(step, NodeId(n as u32), files))
            .collect()
    }

    /// Every node's extent at `step`, in node order.
    ///
    /// Text format reads each data file's header; binary format takes the
    /// extents from the index.
    pub fn node_extents(&self, step: StepId, files: &NodeFiles) -> Result<Vec<Extent>, StageError> {
        Ok(self
            .open_node_streams(step, files)?
            .iter()
            .map(NodeStream::extent)
            .collect())
    }
}

/// Read and parse the `"<columns>-<rows>"` header line.
fn read_header(
    reader: &mut impl BufRead,
    node: NodeId,
    step: StepId,
    path: &Path,
) -> Result<Extent, StageError> {
    let mut bytes = Vec::new();
    reader
        .read_until(b'\n', &mut bytes)
        .map_err(|source| StageError::DataFileUnreadable {
            node,
            path: path.to_path_buf(),
            source,
        })?;
    let line = String::from_utf8_lossy(&bytes);
    let header = line.trim_end_matches(['\n', '\r']);
    header.parse().map_err(|_| StageError::InvalidExtentHeader {
        node,
        step,
        header: header.to_string(),
    })
}
