//! Carving the caller's grid into disjoint per-node write regions.
//!
//! Every node gets exclusive `&mut` row segments covering its sub-rectangle,
//! so node workers can fill the grid concurrently without locks. Overlapping
//! sub-rectangles cannot be expressed this way and are reported as
//! [`StageError::OverlappingNodeRegions`].

use caviz_core::{Extent, Grid, NodeId, Origin, StageError};
use smallvec::SmallVec;

use crate::config::OutOfBounds;

/// The part of the global grid one node may write.
#[derive(Debug)]
pub struct NodeRegion<'g, C> {
    origin: Origin,
    extent: Extent,
    rows: Vec<Option<&'g mut [C]>>,
}

impl<'g, C> NodeRegion<'g, C> {
    /// Origin of the node's sub-grid.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Local extent of the node's sub-grid (before clipping).
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Writable cells of local row `row`, clipped to the grid.
    ///
    /// `None` when the whole row lies outside the grid. The slice starts at
    /// local column 0 and may be shorter than `extent.columns`.
    pub fn row_mut(&mut self, row: u32) -> Option<&mut [C]> {
        self.rows.get_mut(row as usize)?.as_deref_mut()
    }

    /// Writable cell at local `(row, column)`, if inside the grid.
    pub fn cell_mut(&mut self, row: u32, column: u32) -> Option<&mut C> {
        self.row_mut(row)?.get_mut(column as usize)
    }
}

/// Horizontal span of one node on one global row.
#[derive(Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    node: usize,
}

/// Split `grid` into one region per node.
///
/// `placements[n]` is node `n`'s origin and extent. Under
/// [`OutOfBounds::Skip`] the parts of a sub-grid outside the grid are
/// clipped away; under [`OutOfBounds::Error`] any non-empty sub-grid that
/// does not fit fails the whole call before anything is borrowed.
pub fn carve_regions<'g, C>(
    grid: &'g mut Grid<C>,
    placements: &[(Origin, Extent)],
    policy: OutOfBounds,
) -> Result<Vec<NodeRegion<'g, C>>, StageError> {
    let grid_rows = grid.rows();
    let grid_columns = grid.columns();

    // Clipped [x0, x1) × [y0, y1) per node.
    let mut rects = Vec::with_capacity(placements.len());
    for (n, &(origin, extent)) in placements.iter().enumerate() {
        let x0 = origin.x as usize;
        let y0 = origin.y as usize;
        let x_end = x0 + extent.columns as usize;
        let y_end = y0 + extent.rows as usize;
        if policy == OutOfBounds::Error
            && !extent.is_empty()
            && (x_end > grid_columns || y_end > grid_rows)
        {
            return Err(StageError::RegionOutOfBounds {
                node: NodeId(n as u32),
                origin,
                extent,
                grid_rows,
                grid_columns,
            });
        }
        rects.push((
            x0.min(grid_columns),
            x_end.min(grid_columns),
            y0,
            y_end.min(grid_rows),
        ));
    }

    // Only local rows that land inside the grid get a slot.
    let mut regions: Vec<NodeRegion<'g, C>> = placements
        .iter()
        .zip(&rects)
        .map(|(&(origin, extent), &(_, _, y0, y1))| NodeRegion {
            origin,
            extent,
            rows: (0..y1.saturating_sub(y0)).map(|_| None).collect(),
        })
        .collect();

    for (r, row) in grid.rows_mut().enumerate() {
        let mut spans: SmallVec<[Span; 8]> = rects
            .iter()
            .enumerate()
            .filter(|&(_, &(x0, x1, y0, y1))| y0 <= r && r < y1 && x0 < x1)
            .map(|(node, &(x0, x1, _, _))| Span {
                start: x0,
                end: x1,
                node,
            })
            .collect();
        spans.sort_unstable_by_key(|s| s.start);

        for pair in spans.windows(2) {
            if pair[0].end > pair[1].start {
                return Err(StageError::OverlappingNodeRegions {
                    first: NodeId(pair[0].node as u32),
                    second: NodeId(pair[1].node as u32),
                    row: r,
                });
            }
        }

        let mut rest: &'g mut [C] = row;
        let mut consumed = 0;
        for span in spans {
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(span.start - consumed);
            let (segment, tail) = tail.split_at_mut(span.end - span.start);
            let (_, _, y0, _) = rects[span.node];
            regions[span.node].rows[r - y0] = Some(segment);
            rest = tail;
            consumed = span.end;
        }
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(regions: &mut [NodeRegion<'_, u32>]) {
        for (n, region) in regions.iter_mut().enumerate() {
            let extent = region.extent();
            for r in 0..extent.rows {
                if let Some(row) = region.row_mut(r) {
                    for cell in row.iter_mut() {
                        *cell = n as u32 + 1;
                    }
                }
            }
        }
    }

    #[test]
    fn two_by_two_regions_tile_grid() {
        let mut grid: Grid<u32> = Grid::new(11, 18);
        let placements = [
            (Origin::new(0, 0), Extent::new(10, 5)),
            (Origin::new(10, 0), Extent::new(8, 5)),
            (Origin::new(0, 5), Extent::new(10, 6)),
            (Origin::new(10, 5), Extent::new(8, 6)),
        ];
        let mut regions = carve_regions(&mut grid, &placements, OutOfBounds::Error).unwrap();
        fill(&mut regions);
        drop(regions);

        assert_eq!(grid.get(0, 0), Some(&1));
        assert_eq!(grid.get(4, 17), Some(&2));
        assert_eq!(grid.get(5, 9), Some(&3));
        assert_eq!(grid.get(10, 10), Some(&4));
        assert!(grid.as_slice().iter().all(|&v| v != 0));
    }

    #[test]
    fn skip_policy_clips_to_grid() {
        let mut grid: Grid<u32> = Grid::new(3, 3);
        let placements = [(Origin::new(1, 1), Extent::new(4, 4))];
        let mut regions = carve_regions(&mut grid, &placements, OutOfBounds::Skip).unwrap();
        assert_eq!(regions[0].row_mut(0).map(|r| r.len()), Some(2));
        assert!(regions[0].row_mut(2).is_none());
        assert!(regions[0].cell_mut(0, 2).is_none());
        fill(&mut regions);
        drop(regions);
        assert_eq!(grid.as_slice(), &[0, 0, 0, 0, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn error_policy_rejects_overhang() {
        let mut grid: Grid<u32> = Grid::new(3, 3);
        let placements = [(Origin::new(0, 0), Extent::new(3, 4))];
        assert!(matches!(
            carve_regions(&mut grid, &placements, OutOfBounds::Error),
            Err(StageError::RegionOutOfBounds { node: NodeId(0), .. })
        ));
    }

    #[test]
    fn origin_past_grid_is_fully_skipped() {
        let mut grid: Grid<u32> = Grid::new(2, 2);
        let placements = [(Origin::new(5, 0), Extent::new(2, 2))];
        let mut regions = carve_regions(&mut grid, &placements, OutOfBounds::Skip).unwrap();
        assert!(regions[0].row_mut(0).is_none());
        assert!(regions[0].row_mut(1).is_none());
    }

    #[test]
    fn overlapping_nodes_are_rejected() {
        let mut grid: Grid<u32> = Grid::new(4, 4);
        let placements = [
            (Origin::new(0, 0), Extent::new(3, 2)),
            (Origin::new(2, 1), Extent::new(2, 2)),
        ];
        match carve_regions(&mut grid, &placements, OutOfBounds::Skip) {
            Err(StageError::OverlappingNodeRegions { first, second, row }) => {
                assert_eq!(first, NodeId(0));
                assert_eq!(second, NodeId(1));
                assert_eq!(row, 1);
            }
            other => panic!("expected OverlappingNodeRegions, got {other:?}"),
        }
    }

    #[test]
    fn empty_extents_get_no_rows() {
        let mut grid: Grid<u32> = Grid::new(2, 2);
        let placements = [(Origin::new(0, 0), Extent::ZERO), (Origin::new(0, 0), Extent::ZERO)];
        let mut regions = carve_regions(&mut grid, &placements, OutOfBounds::Error).unwrap();
        assert!(regions[0].row_mut(0).is_none());
        assert!(regions[1].row_mut(0).is_none());
    }
}
