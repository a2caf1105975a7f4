//! Node placement within the global grid.
//!
//! Nodes are laid out row-major: `node = row * node_x + col`. A node's
//! origin depends on the extents of the nodes before it in its node-row
//! (x) and node-column (y), and extents can change from step to step, so
//! origins are always computed from the full set of extents for one step.

use caviz_core::{Extent, LineSegment, NodeId, Origin};

/// Origin of `node`'s sub-grid given every node's extent at one step.
///
/// `x` is the sum of the column counts of the nodes to its left in the
/// same node-row; `y` is the sum of the row counts of the nodes above it in
/// the same node-column. Node 0 is always at `(0, 0)`.
///
/// # Panics
///
/// Panics if `node_x` is zero, `node` is not below `node_x * node_y`, or
/// `extents` holds fewer than `node_x * node_y` entries.
///
/// # Examples
///
/// ```
/// use caviz_core::{Extent, NodeId, Origin};
/// use caviz_stage::layout::compute_origin;
///
/// let extents = [
///     Extent::new(10, 5), Extent::new(8, 5),
///     Extent::new(10, 6), Extent::new(8, 6),
/// ];
/// assert_eq!(compute_origin(NodeId(3), 2, 2, &extents), Origin::new(10, 5));
/// ```
pub fn compute_origin(node: NodeId, node_x: u32, node_y: u32, extents: &[Extent]) -> Origin {
    let nodes = node_x as usize * node_y as usize;
    let n = node.index();
    assert!(n < nodes, "node {node} outside {node_x}x{node_y} node grid");
    assert!(
        extents.len() >= nodes,
        "need {nodes} extents, got {}",
        extents.len()
    );

    let stride = node_x as usize;
    let col = if node_y == 1 {
        n % stride
    } else {
        n - (n / stride) * stride
    };
    let row_start = n - col;
    let x = extents[row_start..n]
        .iter()
        .fold(0u32, |acc, e| acc.saturating_add(e.columns));

    let mut y = 0u32;
    let mut above = n;
    while above >= stride {
        above -= stride;
        y = y.saturating_add(extents[above].rows);
    }

    Origin { x, y }
}

/// Origins of every node, in node order.
pub fn compute_origins(node_x: u32, node_y: u32, extents: &[Extent]) -> Vec<Origin> {
    (0..node_x * node_y)
        .map(|n| compute_origin(NodeId(n), node_x, node_y, extents))
        .collect()
}

/// Length of the boundary line array for an `node_x × node_y` run.
///
/// Two slots per node (top and left edges), then one closing bottom edge
/// per node-column and one closing right edge per node-row.
pub fn boundary_slot_count(node_x: u32, node_y: u32) -> usize {
    2 * node_x as usize * node_y as usize + node_x as usize + node_y as usize
}

/// The edges one node contributes to the boundary line array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeBoundaries {
    /// Top edge of the sub-grid.
    pub top: LineSegment,
    /// Left edge of the sub-grid.
    pub left: LineSegment,
    /// Closing bottom edge, only for nodes in the last node-row.
    pub bottom: Option<LineSegment>,
    /// Closing right edge, only for nodes in the last node-column.
    pub right: Option<LineSegment>,
}

/// Edges of `node`'s sub-grid placed at `origin`.
pub fn node_boundaries(
    node: NodeId,
    node_x: u32,
    node_y: u32,
    origin: Origin,
    extent: Extent,
) -> NodeBoundaries {
    let col = node.0 % node_x;
    let row = node.0 / node_x;
    let x0 = origin.x;
    let y0 = origin.y;
    let x1 = x0.saturating_add(extent.columns);
    let y1 = y0.saturating_add(extent.rows);

    NodeBoundaries {
        top: LineSegment::new(x0, y0, x1, y0),
        left: LineSegment::new(x0, y0, x0, y1),
        bottom: (row + 1 == node_y).then(|| LineSegment::new(x0, y1, x1, y1)),
        right: (col + 1 == node_x).then(|| LineSegment::new(x1, y0, x1, y1)),
    }
}

/// One node's exclusive slots in the boundary line array.
#[derive(Debug)]
pub struct BoundarySlots<'a> {
    top: &'a mut LineSegment,
    left: &'a mut LineSegment,
    bottom: Option<&'a mut LineSegment>,
    right: Option<&'a mut LineSegment>,
}

impl BoundarySlots<'_> {
    /// Store a node's edges in its slots.
    pub fn write(&mut self, edges: NodeBoundaries) {
        *self.top = edges.top;
        *self.left = edges.left;
        if let (Some(slot), Some(edge)) = (self.bottom.as_deref_mut(), edges.bottom) {
            *slot = edge;
        }
        if let (Some(slot), Some(edge)) = (self.right.as_deref_mut(), edges.right) {
            *slot = edge;
        }
    }
}

/// Split the boundary line array into per-node slot sets.
///
/// Node `n` owns `lines[2n]` (top) and `lines[2n + 1]` (left); the last
/// node-row owns `lines[2N + col]` (bottom) and the last node-column owns
/// `lines[2N + node_x + row]` (right).
///
/// # Panics
///
/// Panics if `lines.len() != boundary_slot_count(node_x, node_y)`.
pub fn split_boundary_slots(
    lines: &mut [LineSegment],
    node_x: u32,
    node_y: u32,
) -> Vec<BoundarySlots<'_>> {
    assert_eq!(lines.len(), boundary_slot_count(node_x, node_y));
    let nodes = node_x as usize * node_y as usize;
    let (pairs, closing) = lines.split_at_mut(2 * nodes);
    let (bottoms, rights) = closing.split_at_mut(node_x as usize);
    let mut bottoms: Vec<Option<&mut LineSegment>> = bottoms.iter_mut().map(Some).collect();
    let mut rights: Vec<Option<&mut LineSegment>> = rights.iter_mut().map(Some).collect();

    let mut slots = Vec::with_capacity(nodes);
    for (n, pair) in pairs.chunks_exact_mut(2).enumerate() {
        let col = n % node_x as usize;
        let row = n / node_x as usize;
        let (top, left) = pair.split_at_mut(1);
        slots.push(BoundarySlots {
            top: &mut top[0],
            left: &mut left[0],
            bottom: if row + 1 == node_y as usize {
                bottoms[col].take()
            } else {
                None
            },
            right: if col + 1 == node_x as usize {
                rights[row].take()
            } else {
                None
            },
        });
    }
    slots
}
