//! Parallel assembly of one step into the caller's global grid.
//!
//! [`StageReader::read_step`] runs in three phases:
//!
//! 1. **Discovery** (sequential): open every node's stream at the step and
//!    learn its extent. All extents must be known before any origin can be
//!    computed.
//! 2. **Placement**: compute origins, carve the grid into disjoint per-node
//!    regions, and split the boundary line array into per-node slots.
//! 3. **Decode** (one scoped thread per node): each worker owns its stream,
//!    its region and its slots, so the write phase needs no locks.
//!
//! The call returns after every worker has been joined. If any worker
//! failed, the first failure in node order is returned; other nodes have
//! still written their regions.

use std::io::{self, BufRead, Read, Seek};
use std::thread;

use caviz_core::{Cell, CellError, Extent, Grid, LineSegment, Origin, StageError, StepId};
use tracing::{debug, info};

use crate::config::{ConfigError, DataFormat, NodeFiles, StageConfig};
use crate::layout::{
    boundary_slot_count, compute_origins, node_boundaries, split_boundary_slots, BoundarySlots,
};
use crate::node::NodeStream;
use crate::region::{carve_regions, NodeRegion};
use crate::stage::Stage;

/// What [`StageReader::read_step`] delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepFrame {
    /// The step that was requested.
    pub requested: StepId,
    /// The step whose data is now in the grid. Differs from `requested`
    /// only when the terminal-step fallback kicked in.
    pub step: StepId,
    /// Every node's extent at `step`, in node order.
    pub extents: Vec<Extent>,
    /// Every node's origin at `step`, in node order.
    pub origins: Vec<Origin>,
    /// Node boundary segments, laid out as described in
    /// [`split_boundary_slots`].
    pub lines: Vec<LineSegment>,
}

impl StepFrame {
    /// Whether the terminal-step fallback replaced the requested step.
    pub fn fell_back(&self) -> bool {
        self.requested != self.step
    }
}

/// Reads steps of a loaded [`Stage`] into caller-owned grids.
///
/// Borrows the stage immutably, so several readers (or several threads
/// sharing one reader) can read different steps at once.
#[derive(Debug)]
pub struct StageReader<'s> {
    stage: &'s Stage,
    config: &'s StageConfig,
    files: NodeFiles,
}

impl<'s> StageReader<'s> {
    /// Create a reader after validating `config` against `stage`.
    pub fn new(stage: &'s Stage, config: &'s StageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if (stage.node_x(), stage.node_y()) != (config.node_x, config.node_y) {
            return Err(ConfigError::StageShapeMismatch {
                configured: (config.node_x, config.node_y),
                stage: (stage.node_x(), stage.node_y()),
            });
        }
        Ok(Self {
            stage,
            config,
            files: config.files(),
        })
    }

    /// The stage being read.
    pub fn stage(&self) -> &Stage {
        self.stage
    }

    /// Steps available for reading, per the configured strictness.
    pub fn available_steps(&self) -> Result<Vec<StepId>, StageError> {
        self.stage.available_steps(self.config.strict_steps)
    }

    /// Read `step` from every node into `grid`.
    ///
    /// # Errors
    ///
    /// Discovery and placement errors are returned as-is. Errors raised
    /// while decoding a node are wrapped in [`StageError::NodeReadFailure`].
    /// After a decode error the grid may hold data from some nodes.
    pub fn read_step<C: Cell>(
        &self,
        step: StepId,
        grid: &mut Grid<C>,
    ) -> Result<StepFrame, StageError> {
        let mut delivered = step;
        let mut streams = self.open_all(step)?;

        if self.config.terminal_step_fallback == Some(step)
            && streams.iter().all(|s| s.extent().is_empty())
        {
            delivered = step.previous();
            info!(
                requested = step.0,
                fallback = delivered.0,
                "every node empty at terminal step, reading previous step"
            );
            streams = self.open_all(delivered)?;
        }

        let node_x = self.stage.node_x();
        let node_y = self.stage.node_y();
        let extents: Vec<Extent> = streams.iter().map(NodeStream::extent).collect();
        let origins = compute_origins(node_x, node_y, &extents);

        let placements: Vec<(Origin, Extent)> =
            origins.iter().copied().zip(extents.iter().copied()).collect();
        let regions = carve_regions(grid, &placements, self.config.out_of_bounds)?;

        let mut lines = vec![LineSegment::default(); boundary_slot_count(node_x, node_y)];
        let slots = split_boundary_slots(&mut lines, node_x, node_y);

        let failure = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(streams.len());
            for ((stream, region), slots) in streams.into_iter().zip(regions).zip(slots) {
                let node = stream.node();
                let spawned = thread::Builder::new()
                    .name(format!("caviz-node-{node}"))
                    .spawn_scoped(scope, move || {
                        read_node(stream, region, slots, delivered, node_x, node_y)
                    });
                handles.push((node, spawned));
            }

            let mut first: Option<StageError> = None;
            for (node, spawned) in handles {
                let outcome = match spawned {
                    Ok(handle) => match handle.join() {
                        Ok(result) => result.err(),
                        Err(_) => Some(StageError::WorkerPanicked),
                    },
                    Err(source) => Some(StageError::ThreadSpawnFailed { node, source }),
                };
                if let Some(e) = outcome {
                    if first.is_none() {
                        first = Some(match e {
                            e @ StageError::ThreadSpawnFailed { .. } => e,
                            e => StageError::node_failure(node, e),
                        });
                    }
                }
            }
            first
        });

        if let Some(e) = failure {
            return Err(e);
        }

        debug!(
            step = delivered.0,
            nodes = extents.len(),
            "step assembled"
        );
        Ok(StepFrame {
            requested: step,
            step: delivered,
            extents,
            origins,
            lines,
        })
    }

    /// Discovery pass: every node's stream at `step`, in node order.
    fn open_all(&self, step: StepId) -> Result<Vec<NodeStream>, StageError> {
        self.stage.open_node_streams(step, &self.files)
    }
}

/// Worker body: decode one node's records into its region.
fn read_node<C: Cell>(
    mut stream: NodeStream,
    mut region: NodeRegion<'_, C>,
    mut slots: BoundarySlots<'_>,
    step: StepId,
    node_x: u32,
    node_y: u32,
) -> Result<(), StageError> {
    let node = stream.node();
    slots.write(node_boundaries(
        node,
        node_x,
        node_y,
        region.origin(),
        region.extent(),
    ));

    match stream.format() {
        DataFormat::Text => decode_text(&mut stream, &mut region, step)?,
        DataFormat::Binary => decode_binary(&mut stream, &mut region, step)?,
    }

    debug!(
        node = node.0,
        step = step.0,
        extent = %region.extent(),
        "node decoded"
    );
    Ok(())
}

/// Fresh cell for local `(row, column)`, with `start_step` on the node's
/// first cell.
fn fresh_cell<C: Cell>(row: u32, column: u32, step: StepId) -> C {
    let mut cell = C::default();
    if row == 0 && column == 0 {
        cell.start_step(step);
    }
    cell
}

fn decode_text<C: Cell>(
    stream: &mut NodeStream,
    region: &mut NodeRegion<'_, C>,
    step: StepId,
) -> Result<(), StageError> {
    let node = stream.node();
    let extent = region.extent();
    let mut bytes = Vec::new();

    for row in 0..extent.rows {
        bytes.clear();
        let read = stream
            .reader()
            .read_until(b'\n', &mut bytes)
            .map_err(|source| read_error(stream, source))?;
        if read == 0 {
            return Err(StageError::TruncatedRecord {
                node,
                step,
                row,
                detail: format!("expected {} rows, data ended", extent.rows),
            });
        }

        // Invalid UTF-8 reaches the cell as U+FFFD and is rejected there.
        let line = String::from_utf8_lossy(&bytes);
        let mut tokens = line.split_whitespace();
        for column in 0..extent.columns {
            let token = tokens.next().ok_or_else(|| StageError::TruncatedRecord {
                node,
                step,
                row,
                detail: format!("expected {} tokens, found {column}", extent.columns),
            })?;
            if let Some(slot) = region.cell_mut(row, column) {
                let mut cell = fresh_cell::<C>(row, column, step);
                cell.compose_element(token)
                    .map_err(|source| StageError::CellDecode {
                        node,
                        row,
                        column,
                        source,
                    })?;
                *slot = cell;
            }
        }
    }
    Ok(())
}

fn decode_binary<C: Cell>(
    stream: &mut NodeStream,
    region: &mut NodeRegion<'_, C>,
    step: StepId,
) -> Result<(), StageError> {
    let node = stream.node();
    let extent = region.extent();
    if extent.is_empty() {
        return Ok(());
    }
    if C::RECORD_SIZE == 0 {
        return Err(StageError::CellDecode {
            node,
            row: 0,
            column: 0,
            source: CellError::Unsupported {
                what: "zero-sized binary records",
            },
        });
    }

    // Index-supplied extent must fit in what is left of the file.
    let remaining = remaining_bytes(stream)?;
    let row_bytes = (extent.columns as usize).checked_mul(C::RECORD_SIZE);
    let needed = row_bytes.and_then(|b| (b as u64).checked_mul(u64::from(extent.rows)));
    let row_bytes = match (row_bytes, needed) {
        (Some(row_bytes), Some(needed)) if needed <= remaining => row_bytes,
        _ => {
            let complete = row_bytes
                .map(|b| remaining / b as u64)
                .unwrap_or(0)
                .min(u64::from(extent.rows));
            return Err(StageError::TruncatedRecord {
                node,
                step,
                row: complete as u32,
                detail: format!(
                    "{} rows of {} records of {} bytes exceed the {remaining} bytes left",
                    extent.rows,
                    extent.columns,
                    C::RECORD_SIZE
                ),
            });
        }
    };

    let mut buf = vec![0u8; row_bytes];
    for row in 0..extent.rows {
        if let Err(source) = stream.reader().read_exact(&mut buf) {
            return Err(if source.kind() == io::ErrorKind::UnexpectedEof {
                StageError::TruncatedRecord {
                    node,
                    step,
                    row,
                    detail: format!(
                        "expected {} bytes per row, data ended",
                        buf.len()
                    ),
                }
            } else {
                read_error(stream, source)
            });
        }

        let Some(cells) = region.row_mut(row) else {
            continue;
        };
        for (column, (record, slot)) in buf
            .chunks_exact(C::RECORD_SIZE)
            .zip(cells.iter_mut())
            .enumerate()
        {
            let column = column as u32;
            let mut cell = fresh_cell::<C>(row, column, step);
            cell.decode_record(record)
                .map_err(|source| StageError::CellDecode {
                    node,
                    row,
                    column,
                    source,
                })?;
            *slot = cell;
        }
    }
    Ok(())
}

/// Bytes between the stream's position and the end of its file.
fn remaining_bytes(stream: &mut NodeStream) -> Result<u64, StageError> {
    let reader = stream.reader();
    let len = reader.get_ref().metadata().map(|m| m.len());
    let position = reader.stream_position();
    match (len, position) {
        (Ok(len), Ok(position)) => Ok(len.saturating_sub(position)),
        (Err(source), _) | (_, Err(source)) => Err(read_error(stream, source)),
    }
}

fn read_error(stream: &NodeStream, source: io::Error) -> StageError {
    StageError::DataFileUnreadable {
        node: stream.node(),
        path: stream.path().to_path_buf(),
        source,
    }
}
