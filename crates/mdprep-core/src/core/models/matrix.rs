use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// Upper bound on `cols * rows` accepted by [`StructureMatrix::try_new`].
pub const MAX_CELLS: usize = 1 << 28;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("No legend entry for code '{0}'")]
    MissingLegendCode(char),
    #[error("Row {row} is out of range for a matrix with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("Row {row} has {found} characters, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("The {axis} holds {capacity} ticks, cannot append {requested} more after {filled}")]
    AxisOverflow {
        axis: AxisName,
        capacity: usize,
        filled: usize,
        requested: usize,
    },
    #[error("A {cols}x{rows} grid exceeds the cell limit")]
    TooLarge { cols: usize, rows: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisName {
    X,
    Y,
}

impl AxisName {
    /// The label used by axis declaration comments, e.g. `x-axis`.
    pub fn label(self) -> &'static str {
        match self {
            AxisName::X => "x-axis",
            AxisName::Y => "y-axis",
        }
    }
}

impl fmt::Display for AxisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tick labels for one dimension of the matrix, filled incrementally up to a
/// fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    name: AxisName,
    capacity: usize,
    ticks: Vec<String>,
}

impl Axis {
    pub fn new(name: AxisName, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            ticks: Vec::new(),
        }
    }

    pub fn name(&self) -> AxisName {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ticks.len() == self.capacity
    }

    /// Appends a batch of ticks. Either the whole batch fits or nothing is added.
    pub fn extend<I, S>(&mut self, values: I) -> Result<(), MatrixError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if self.ticks.len() + values.len() > self.capacity {
            return Err(MatrixError::AxisOverflow {
                axis: self.name,
                capacity: self.capacity,
                filled: self.ticks.len(),
                requested: values.len(),
            });
        }
        self.ticks.extend(values);
        Ok(())
    }

    pub fn get(&self, ix: usize) -> Option<&str> {
        self.ticks.get(ix).map(String::as_str)
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.ticks.iter().position(|t| t == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ticks.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub color: String,
    pub name: String,
}

impl LegendEntry {
    pub fn new(color: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            name: name.into(),
        }
    }
}

/// A fixed-size grid of single-character category codes with per-dimension
/// tick labels and a code legend.
///
/// Columns run along the x axis (time, for DSSP output) and rows along the y
/// axis (residues). Row 0 is the bottom row of the rendered pixmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureMatrix {
    cols: usize,
    rows: usize,
    data: Vec<char>,
    x: Axis,
    y: Axis,
    legend: BTreeMap<char, LegendEntry>,
}

impl StructureMatrix {
    /// Creates a `rows x cols` grid filled with spaces.
    ///
    /// # Panics
    ///
    /// Panics if the grid exceeds [`MAX_CELLS`]. Use [`StructureMatrix::try_new`]
    /// for dimensions read from untrusted input.
    pub fn new(cols: usize, rows: usize) -> Self {
        match Self::try_new(cols, rows) {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a `rows x cols` grid filled with spaces, rejecting grids whose
    /// cell count overflows or exceeds [`MAX_CELLS`].
    pub fn try_new(cols: usize, rows: usize) -> Result<Self, MatrixError> {
        let cells = cols
            .checked_mul(rows)
            .filter(|&cells| cells <= MAX_CELLS)
            .ok_or(MatrixError::TooLarge { cols, rows })?;
        Ok(Self {
            cols,
            rows,
            data: vec![' '; cells],
            x: Axis::new(AxisName::X, cols),
            y: Axis::new(AxisName::Y, rows),
            legend: BTreeMap::new(),
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `(cols, rows)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn column_indices(&self) -> Range<usize> {
        0..self.cols
    }

    pub fn set_row(&mut self, row: usize, codes: &str) -> Result<(), MatrixError> {
        if row >= self.rows {
            return Err(MatrixError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        let found = codes.chars().count();
        if found != self.cols {
            return Err(MatrixError::RowLength {
                row,
                expected: self.cols,
                found,
            });
        }
        let start = row * self.cols;
        for (slot, code) in self.data[start..start + self.cols].iter_mut().zip(codes.chars()) {
            *slot = code;
        }
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<&[char]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    /// The codes of column `col` across all rows, starting from row 0.
    pub fn column(&self, col: usize) -> Option<Vec<char>> {
        if col >= self.cols {
            return None;
        }
        Some(
            (0..self.rows)
                .map(|row| self.data[row * self.cols + col])
                .collect(),
        )
    }

    pub fn get(&self, row: usize, col: usize) -> Option<char> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }

    pub fn axis(&self, name: AxisName) -> &Axis {
        match name {
            AxisName::X => &self.x,
            AxisName::Y => &self.y,
        }
    }

    pub fn axis_mut(&mut self, name: AxisName) -> &mut Axis {
        match name {
            AxisName::X => &mut self.x,
            AxisName::Y => &mut self.y,
        }
    }

    pub fn tick(&self, name: AxisName, ix: usize) -> Option<&str> {
        self.axis(name).get(ix)
    }

    pub fn xtick(&self, ix: usize) -> Option<&str> {
        self.tick(AxisName::X, ix)
    }

    pub fn ytick(&self, ix: usize) -> Option<&str> {
        self.tick(AxisName::Y, ix)
    }

    pub fn insert_legend(&mut self, code: char, entry: LegendEntry) -> Option<LegendEntry> {
        self.legend.insert(code, entry)
    }

    pub fn legend(&self) -> &BTreeMap<char, LegendEntry> {
        &self.legend
    }

    /// The category name declared for `code`.
    pub fn category(&self, code: char) -> Result<&str, MatrixError> {
        self.legend
            .get(&code)
            .map(|e| e.name.as_str())
            .ok_or(MatrixError::MissingLegendCode(code))
    }

    pub fn color(&self, code: char) -> Result<&str, MatrixError> {
        self.legend
            .get(&code)
            .map(|e| e.color.as_str())
            .ok_or(MatrixError::MissingLegendCode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructureMatrix {
        let mut m = StructureMatrix::new(3, 2);
        m.set_row(0, "ABC").unwrap();
        m.set_row(1, "CBA").unwrap();
        m.insert_legend('A', LegendEntry::new("#FF0000", "A-Helix"));
        m
    }

    #[test]
    fn rows_and_columns_are_addressable() {
        let m = sample();
        assert_eq!(m.dimensions(), (3, 2));
        assert_eq!(m.row(1).unwrap(), &['C', 'B', 'A']);
        assert_eq!(m.column(0).unwrap(), vec!['A', 'C']);
        assert_eq!(m.column(2).unwrap(), vec!['C', 'A']);
        assert_eq!(m.get(0, 1), Some('B'));
        assert!(m.column(3).is_none());
        assert!(m.row(2).is_none());
    }

    #[test]
    fn set_row_validates_length_and_index() {
        let mut m = StructureMatrix::new(3, 2);
        assert_eq!(
            m.set_row(0, "AB"),
            Err(MatrixError::RowLength {
                row: 0,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            m.set_row(2, "ABC"),
            Err(MatrixError::RowOutOfRange { row: 2, rows: 2 })
        );
    }

    #[test]
    fn axis_rejects_batches_past_capacity() {
        let mut m = StructureMatrix::new(3, 2);
        m.axis_mut(AxisName::X).extend(["0", "10"]).unwrap();
        let err = m.axis_mut(AxisName::X).extend(["20", "30"]).unwrap_err();
        assert!(matches!(err, MatrixError::AxisOverflow { filled: 2, .. }));
        assert_eq!(m.axis(AxisName::X).len(), 2);
        m.axis_mut(AxisName::X).extend(["20"]).unwrap();
        assert!(m.axis(AxisName::X).is_full());
        assert_eq!(m.xtick(2), Some("20"));
        assert_eq!(m.axis(AxisName::X).position("10"), Some(1));
        assert_eq!(m.ytick(0), None);
    }

    #[test]
    fn oversized_grids_are_rejected() {
        assert_eq!(
            StructureMatrix::try_new(usize::MAX, 2),
            Err(MatrixError::TooLarge {
                cols: usize::MAX,
                rows: 2
            })
        );
        assert!(StructureMatrix::try_new(MAX_CELLS + 1, 1).is_err());
        assert_eq!(StructureMatrix::try_new(0, 5).unwrap().dimensions(), (0, 5));
    }

    #[test]
    fn axis_capacity_is_not_preallocated() {
        let mut axis = Axis::new(AxisName::Y, usize::MAX);
        assert!(axis.is_empty());
        axis.extend(["1", "2"]).unwrap();
        assert_eq!(axis.len(), 2);
        assert!(!axis.is_full());
    }

    #[test]
    fn category_lookup_reports_missing_codes() {
        let m = sample();
        assert_eq!(m.category('A').unwrap(), "A-Helix");
        assert_eq!(m.color('A').unwrap(), "#FF0000");
        assert_eq!(m.category('Z'), Err(MatrixError::MissingLegendCode('Z')));
    }
}
