//! On-disk run fixtures.
//!
//! A [`RunFixture`] owns a temporary directory laid out like a finished
//! distributed run: one data file and one index file per node, named the
//! way [`NodeFiles`] expects. Data cells are [`SentinelCell`] tokens or
//! records, so every decoded cell says which node and local position it
//! came from.
//!
//! - [`write_text_node`] / [`write_binary_node`] write one node's data file.
//! - [`index_text`] renders index lines in legacy or extended form.
//! - [`RunFixture`] ties both together for a whole node grid.

use std::fs;
use std::io;
use std::path::Path;

use caviz_core::{Extent, NodeId, OffsetRecord, StepId};
use caviz_stage::{DataFormat, LoadPolicy, NodeFiles, Stage, StageConfig};
use tempfile::TempDir;

use crate::SentinelCell;

/// Which index line form to write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexStyle {
    /// `<step> <position>`
    Legacy,
    /// `<step> <position> (<columns>-<rows>)`
    Extended,
}

/// One step of a run: every node's extent, in node order.
#[derive(Clone, Debug)]
pub struct StepSpec {
    pub step: StepId,
    pub extents: Vec<Extent>,
}

impl StepSpec {
    pub fn new(step: i64, extents: Vec<Extent>) -> Self {
        Self {
            step: StepId(step),
            extents,
        }
    }

    /// Every node has the same extent.
    pub fn uniform(step: i64, nodes: usize, extent: Extent) -> Self {
        Self::new(step, vec![extent; nodes])
    }
}

/// Write a text data file holding `steps` for `node`.
///
/// Each step is a `"<columns>-<rows>"` header line followed by `rows` lines
/// of sentinel tokens. Returns the offset record of each step, in order.
pub fn write_text_node(
    path: &Path,
    node: NodeId,
    steps: &[(StepId, Extent)],
) -> io::Result<Vec<(StepId, OffsetRecord)>> {
    let mut out = String::new();
    let mut records = Vec::with_capacity(steps.len());
    for &(step, extent) in steps {
        records.push((step, OffsetRecord::with_extent(out.len() as u64, extent)));
        out.push_str(&format!("{extent}\n"));
        for row in 0..extent.rows {
            let tokens: Vec<String> = (0..extent.columns)
                .map(|column| SentinelCell::token(node.0, row, column))
                .collect();
            out.push_str(&tokens.join(" "));
            out.push('\n');
        }
    }
    fs::write(path, out)?;
    Ok(records)
}

/// Write a binary data file holding `steps` for `node`.
///
/// Steps are back to back with no header. Returns the offset record of each
/// step, in order.
pub fn write_binary_node(
    path: &Path,
    node: NodeId,
    steps: &[(StepId, Extent)],
) -> io::Result<Vec<(StepId, OffsetRecord)>> {
    let mut out = Vec::new();
    let mut records = Vec::with_capacity(steps.len());
    for &(step, extent) in steps {
        records.push((step, OffsetRecord::with_extent(out.len() as u64, extent)));
        for row in 0..extent.rows {
            for column in 0..extent.columns {
                out.extend_from_slice(&SentinelCell::record(node.0, row, column));
            }
        }
    }
    fs::write(path, out)?;
    Ok(records)
}

/// Render index lines for `records`.
pub fn index_text(records: &[(StepId, OffsetRecord)], style: IndexStyle) -> String {
    let mut out = String::new();
    for (step, record) in records {
        match (style, record.extent) {
            (IndexStyle::Extended, Some(extent)) => {
                out.push_str(&format!("{step} {} ({extent})\n", record.position))
            }
            _ => out.push_str(&format!("{step} {}\n", record.position)),
        }
    }
    out
}

/// A complete run on disk in a temporary directory.
pub struct RunFixture {
    dir: TempDir,
    config: StageConfig,
    records: Vec<Vec<(StepId, OffsetRecord)>>,
}

impl RunFixture {
    /// Write a `node_x × node_y` run holding `steps`.
    ///
    /// Binary runs always get extended index lines, whatever `style` says.
    pub fn write(
        node_x: u32,
        node_y: u32,
        format: DataFormat,
        steps: &[StepSpec],
        style: IndexStyle,
    ) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = StageConfig {
            data_dir: dir.path().to_path_buf(),
            base_name: "run".into(),
            node_x,
            node_y,
            format,
            ..StageConfig::default()
        };
        let files = config.files();
        let style = match format {
            DataFormat::Text => style,
            DataFormat::Binary => IndexStyle::Extended,
        };

        let mut records = Vec::with_capacity(config.node_count());
        for n in 0..config.node_count() {
            let node = NodeId(n as u32);
            let node_steps: Vec<(StepId, Extent)> =
                steps.iter().map(|s| (s.step, s.extents[n])).collect();
            let written = match format {
                DataFormat::Text => write_text_node(&files.data_path(node), node, &node_steps)?,
                DataFormat::Binary => write_binary_node(&files.data_path(node), node, &node_steps)?,
            };
            fs::write(files.index_path(node), index_text(&written, style))?;
            records.push(written);
        }

        Ok(Self {
            dir,
            config,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut StageConfig {
        &mut self.config
    }

    pub fn files(&self) -> NodeFiles {
        self.config.files()
    }

    /// Offset records written for `node`, in step order.
    pub fn records(&self, node: NodeId) -> &[(StepId, OffsetRecord)] {
        &self.records[node.index()]
    }

    /// Replace a node's index file.
    pub fn write_index(&self, node: NodeId, contents: &str) -> io::Result<()> {
        fs::write(self.files().index_path(node), contents)
    }

    /// Replace a node's data file.
    pub fn write_data(&self, node: NodeId, contents: impl AsRef<[u8]>) -> io::Result<()> {
        fs::write(self.files().data_path(node), contents)
    }

    /// Remove a node's index file.
    pub fn remove_index(&self, node: NodeId) -> io::Result<()> {
        fs::remove_file(self.files().index_path(node))
    }

    /// A stage with every node's index loaded.
    ///
    /// Panics if any index fails to load.
    pub fn load_stage(&self) -> Stage {
        let mut stage = Stage::prepare(self.config.node_x, self.config.node_y);
        if let Err(e) = stage.load_all(&self.config, LoadPolicy::AbortOnError) {
            panic!("fixture stage failed to load: {e}");
        }
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_offsets_point_at_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n0.txt");
        let steps = [
            (StepId(0), Extent::new(2, 1)),
            (StepId(1), Extent::new(1, 2)),
        ];
        let records = write_text_node(&path, NodeId(4), &steps).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert_eq!(records[0].1.position.0, 0);
        let second = records[1].1.position.0 as usize;
        assert_eq!(&text[..second], "2-1\n4:0:0 4:0:1\n");
        assert_eq!(&text[second..], "1-2\n4:0:0\n4:1:0\n");
    }

    #[test]
    fn binary_offsets_skip_whole_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n0.bin");
        let steps = [
            (StepId(5), Extent::new(3, 2)),
            (StepId(6), Extent::new(1, 1)),
        ];
        let records = write_binary_node(&path, NodeId(0), &steps).unwrap();
        assert_eq!(records[1].1.position.0, 6 * 12);
        assert_eq!(fs::metadata(&path).unwrap().len(), 7 * 12);
    }

    #[test]
    fn index_styles() {
        let records = [(StepId(3), OffsetRecord::with_extent(40, Extent::new(5, 6)))];
        assert_eq!(index_text(&records, IndexStyle::Legacy), "3 40\n");
        assert_eq!(index_text(&records, IndexStyle::Extended), "3 40 (5-6)\n");
    }
}
