//! Strongly-typed identifiers and small geometry value types.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Identifies a simulation step.
///
/// Steps are recorded by the simulation as plain integers; they are not
/// required to be contiguous, and the first recorded step need not be 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub i64);

impl StepId {
    /// The step immediately before this one.
    pub fn previous(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StepId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Identifies a worker node (shard) of the distributed simulation.
///
/// Nodes are laid out row-major over an `node_x × node_y` grid:
/// `NodeId(row * node_x + col)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The node id as a slice index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Byte offset into a node's data file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePosition(pub u64);

impl fmt::Display for FilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FilePosition {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Local grid dimensions of one node at one step.
///
/// Written on disk as `"<columns>-<rows>"`, both in text data headers and
/// in the extended index annotation `(<columns>-<rows>)`.
///
/// # Examples
///
/// ```
/// use caviz_core::Extent;
///
/// let extent: Extent = "12-7".parse().unwrap();
/// assert_eq!(extent, Extent::new(12, 7));
/// assert_eq!(extent.cell_count(), 84);
/// assert!("12".parse::<Extent>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Number of columns (x direction).
    pub columns: u32,
    /// Number of rows (y direction).
    pub rows: u32,
}

impl Extent {
    /// The empty extent, reported by nodes past their last recorded step.
    pub const ZERO: Extent = Extent {
        columns: 0,
        rows: 0,
    };

    /// Create an extent from column and row counts.
    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Total number of cells covered by this extent.
    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Whether the extent covers no cells at all.
    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.columns, self.rows)
    }
}

/// Error returned when a `"C-R"` extent string cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseExtentError {
    /// The text that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseExtentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected \"<columns>-<rows>\", got {:?}", self.input)
    }
}

impl Error for ParseExtentError {}

impl FromStr for Extent {
    type Err = ParseExtentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseExtentError {
            input: s.to_string(),
        };
        // Surrounding whitespace is tolerated; each field is plain digits.
        let field = |t: &str| -> Result<u32, ParseExtentError> {
            if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            t.parse().map_err(|_| err())
        };
        let (cols, rows) = s.trim().split_once('-').ok_or_else(err)?;
        Ok(Extent {
            columns: field(cols)?,
            rows: field(rows)?,
        })
    }
}

/// Position of a node's local sub-grid within the global grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Origin {
    /// Column of the sub-grid's top-left cell.
    pub x: u32,
    /// Row of the sub-grid's top-left cell.
    pub y: u32,
}

impl Origin {
    /// Create an origin from `(x, y)`.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Where a step's record starts inside a node's data file.
///
/// `extent` is only known when the index used the extended
/// `(<columns>-<rows>)` annotation. Text data files repeat the extent as a
/// header line at `position`; binary data files have no header and require it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetRecord {
    /// Byte offset of the first byte of the record.
    pub position: FilePosition,
    /// Local grid extent, if the index recorded one.
    pub extent: Option<Extent>,
}

impl OffsetRecord {
    /// A record carrying only a byte position (legacy index lines).
    pub fn at(position: u64) -> Self {
        Self {
            position: FilePosition(position),
            extent: None,
        }
    }

    /// A record carrying a byte position and the node's local extent.
    pub fn with_extent(position: u64, extent: Extent) -> Self {
        Self {
            position: FilePosition(position),
            extent: Some(extent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extent_parses_header_form() {
        assert_eq!("12-7".parse::<Extent>(), Ok(Extent::new(12, 7)));
        assert_eq!("  3-4\r\n".parse::<Extent>(), Ok(Extent::new(3, 4)));
        assert_eq!("0-0".parse::<Extent>(), Ok(Extent::ZERO));
    }

    #[test]
    fn extent_rejects_missing_separator() {
        let err = "12".parse::<Extent>().unwrap_err();
        assert_eq!(err.input, "12");
    }

    #[test]
    fn extent_rejects_non_numeric_fields() {
        assert!("a-7".parse::<Extent>().is_err());
        assert!("12-".parse::<Extent>().is_err());
        assert!("-12-7".parse::<Extent>().is_err());
        assert!("".parse::<Extent>().is_err());
    }

    #[test]
    fn extent_rejects_signs_and_inner_spaces() {
        assert!("+12-7".parse::<Extent>().is_err());
        assert!("12-+7".parse::<Extent>().is_err());
        assert!("12 -7".parse::<Extent>().is_err());
        assert!("+12- 7".parse::<Extent>().is_err());
        assert!("12-99999999999".parse::<Extent>().is_err());
    }

    #[test]
    fn zero_extent_is_empty() {
        assert!(Extent::ZERO.is_empty());
        assert!(Extent::new(4, 0).is_empty());
        assert!(!Extent::new(1, 1).is_empty());
    }

    #[test]
    fn step_previous_saturates() {
        assert_eq!(StepId(4000).previous(), StepId(3999));
        assert_eq!(StepId(i64::MIN).previous(), StepId(i64::MIN));
    }

    proptest! {
        #[test]
        fn extent_without_separator_never_parses(text in "[0-9 ]{0,12}") {
            prop_assert!(text.parse::<Extent>().is_err());
        }
    }
}
