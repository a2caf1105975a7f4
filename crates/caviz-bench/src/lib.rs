//! Benchmark profiles for the caviz stage reader.
//!
//! Each profile writes a complete run of sentinel cells to a temporary
//! directory:
//!
//! - [`reference_profile`]: 2x2 nodes of 64x64 cells, 8 steps
//! - [`stress_profile`]: 4x4 nodes of 128x128 cells, 4 steps
//!
//! Node extents vary per node-column and per node-row so the origin
//! computation is not a plain multiply.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::io;

use caviz_core::{Extent, Grid};
use caviz_stage::DataFormat;
use caviz_test_utils::fixtures::{IndexStyle, RunFixture, StepSpec};
use caviz_test_utils::SentinelCell;

/// A run on disk plus the global grid size that exactly holds it.
pub struct Profile {
    /// The written run.
    pub run: RunFixture,
    /// Global rows.
    pub rows: usize,
    /// Global columns.
    pub columns: usize,
    /// Recorded steps.
    pub steps: usize,
}

impl Profile {
    /// A grid sized for this run.
    pub fn grid(&self) -> Grid<SentinelCell> {
        Grid::new(self.rows, self.columns)
    }
}

/// 2x2 nodes, about 64x64 cells each, 8 steps.
pub fn reference_profile(format: DataFormat) -> io::Result<Profile> {
    build(2, 2, 64, 8, format)
}

/// 4x4 nodes, about 128x128 cells each, 4 steps.
pub fn stress_profile(format: DataFormat) -> io::Result<Profile> {
    build(4, 4, 128, 4, format)
}

/// Node-column `c` gets `side + c` columns, node-row `r` gets `side + r`
/// rows, so every node-row and node-column tiles exactly.
fn build(node_x: u32, node_y: u32, side: u32, steps: usize, format: DataFormat) -> io::Result<Profile> {
    let extents: Vec<Extent> = (0..node_x * node_y)
        .map(|n| Extent::new(side + n % node_x, side + n / node_x))
        .collect();
    let specs: Vec<StepSpec> = (0..steps as i64)
        .map(|s| StepSpec::new(s * 100, extents.clone()))
        .collect();
    let run = RunFixture::write(node_x, node_y, format, &specs, IndexStyle::Extended)?;

    let columns = (0..node_x).map(|c| (side + c) as usize).sum();
    let rows = (0..node_y).map(|r| (side + r) as usize).sum();
    Ok(Profile {
        run,
        rows,
        columns,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use caviz_core::StepId;
    use caviz_stage::StageReader;

    #[test]
    fn reference_profile_fills_its_grid() {
        let profile = reference_profile(DataFormat::Text).unwrap();
        assert_eq!((profile.rows, profile.columns), (129, 129));

        let stage = profile.run.load_stage();
        let reader = StageReader::new(&stage, profile.run.config()).unwrap();
        assert_eq!(reader.available_steps().unwrap().len(), profile.steps);

        let mut grid = profile.grid();
        reader.read_step(StepId(700), &mut grid).unwrap();
        assert!(grid.as_slice().iter().all(|c| c.decoded));
    }
}
