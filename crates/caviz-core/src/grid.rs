//! Caller-owned global grid and node boundary segments.

/// Row-major `rows × columns` container of cells.
///
/// The grid belongs to the caller (typically the rendering layer). The
/// stage reader only writes into node sub-rectangles of it and never
/// resizes it.
///
/// # Examples
///
/// ```
/// use caviz_core::Grid;
///
/// let mut grid: Grid<u8> = Grid::new(2, 3);
/// *grid.get_mut(1, 2).unwrap() = 7;
/// assert_eq!(grid.row(1), Some(&[0, 0, 7][..]));
/// assert_eq!(grid.get(2, 0), None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<C> {
    rows: usize,
    columns: usize,
    cells: Vec<C>,
}

impl<C: Default> Grid<C> {
    /// Allocate a grid filled with `C::default()`.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::from_fn(rows, columns, |_, _| C::default())
    }

    /// Reset every cell to `C::default()`.
    pub fn clear(&mut self) {
        self.fill_with(|_, _| C::default());
    }
}

impl<C> Grid<C> {
    /// Allocate a grid whose cell at `(row, column)` is `f(row, column)`.
    pub fn from_fn(rows: usize, columns: usize, mut f: impl FnMut(usize, usize) -> C) -> Self {
        let mut cells = Vec::with_capacity(rows * columns);
        for r in 0..rows {
            for c in 0..columns {
                cells.push(f(r, c));
            }
        }
        Self {
            rows,
            columns,
            cells,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `(row, column)`, or `None` if out of bounds.
    pub fn get(&self, row: usize, column: usize) -> Option<&C> {
        if row < self.rows && column < self.columns {
            self.cells.get(row * self.columns + column)
        } else {
            None
        }
    }

    /// Mutable cell at `(row, column)`, or `None` if out of bounds.
    pub fn get_mut(&mut self, row: usize, column: usize) -> Option<&mut C> {
        if row < self.rows && column < self.columns {
            self.cells.get_mut(row * self.columns + column)
        } else {
            None
        }
    }

    /// One full row, or `None` if out of bounds.
    pub fn row(&self, row: usize) -> Option<&[C]> {
        if row < self.rows {
            let start = row * self.columns;
            Some(&self.cells[start..start + self.columns])
        } else {
            None
        }
    }

    /// Mutable iterator over full rows, top to bottom.
    ///
    /// Yields nothing for a grid with zero columns.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [C]> {
        let width = self.columns.max(1);
        let rows = if self.columns == 0 { 0 } else { self.rows };
        self.cells.chunks_mut(width).take(rows)
    }

    /// Row-major view of all cells.
    pub fn as_slice(&self) -> &[C] {
        &self.cells
    }

    /// Overwrite every cell with `f(row, column)`.
    pub fn fill_with(&mut self, mut f: impl FnMut(usize, usize) -> C) {
        let columns = self.columns;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            *cell = f(i / columns, i % columns);
        }
    }
}

/// A straight segment between two grid-corner coordinates `(x, y)`.
///
/// Node boundaries are axis-aligned: either `from.1 == to.1` (horizontal)
/// or `from.0 == to.0` (vertical).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LineSegment {
    /// Start point `(x, y)`.
    pub from: (u32, u32),
    /// End point `(x, y)`.
    pub to: (u32, u32),
}

impl LineSegment {
    /// Segment from `(x0, y0)` to `(x1, y1)`.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            from: (x0, y0),
            to: (x1, y1),
        }
    }
}
