//! Sparse input model shared by both kernel layouts

use std::fmt;
use std::ops::Range;

use num_traits::Num;

use crate::error::{Result, SpmvError};

/// A square sparse matrix in row-compressed form together with the
/// right-hand-side vector x of the product y = A·x.
///
/// This is the input every layout builder consumes. It is owned by the
/// caller and only read by the kernels:
/// - row_ptr: Array of size n_rows + 1, row i owns `row_ptr[i]..row_ptr[i + 1]`
/// - col_idx: Array of size nnz containing column indices in `0..n_rows`
/// - values: Array of size nnz containing the non-zero values
/// - rhs: Array of size n_rows, the x vector
#[derive(Clone)]
pub struct SparseMatrixInput<T> {
    /// Number of rows (and columns) in the matrix
    pub n_rows: usize,

    /// Row pointers (size: n_rows + 1)
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz)
    pub col_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<T>,

    /// Right-hand side x (size: n_rows)
    pub rhs: Vec<T>,
}

impl<T> SparseMatrixInput<T>
where
    T: Copy + Num,
{
    /// Creates a new input from its parts, rejecting inconsistent data
    ///
    /// # Errors
    ///
    /// Returns an error if any of the structural invariants checked by
    /// [`validate`](Self::validate) does not hold.
    pub fn new(
        n_rows: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
        rhs: Vec<T>,
    ) -> Result<Self> {
        let input = Self {
            n_rows,
            row_ptr,
            col_idx,
            values,
            rhs,
        };
        input.validate()?;
        Ok(input)
    }

    /// Creates an input with x set to all ones
    pub fn from_csr_parts(
        n_rows: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        Self::new(n_rows, row_ptr, col_idx, values, vec![T::one(); n_rows])
    }

    /// Builds an input from per-row `(column, value)` lists
    pub fn from_rows(rows: &[Vec<(usize, T)>], rhs: Vec<T>) -> Result<Self> {
        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();

        row_ptr.push(0);
        for row in rows {
            for &(col, val) in row {
                col_idx.push(col);
                values.push(val);
            }
            row_ptr.push(col_idx.len());
        }

        Self::new(rows.len(), row_ptr, col_idx, values, rhs)
    }

    /// Creates an identity matrix of the given size with x set to all ones
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![T::one(); n],
            rhs: vec![T::one(); n],
        }
    }

    /// Checks every structural invariant the kernels rely on
    ///
    /// - `row_ptr.len() == n_rows + 1`, `row_ptr[0] == 0`, `row_ptr[n_rows] == nnz`
    /// - `row_ptr` is non-decreasing
    /// - `col_idx.len() == values.len()` and `rhs.len() == n_rows`
    /// - every column index lies in `0..n_rows`
    pub fn validate(&self) -> Result<()> {
        if self.row_ptr.len() != self.n_rows + 1 {
            return Err(SpmvError::LengthMismatch {
                what: "row_ptr",
                expected: self.n_rows + 1,
                got: self.row_ptr.len(),
            });
        }
        if self.col_idx.len() != self.values.len() {
            return Err(SpmvError::LengthMismatch {
                what: "values",
                expected: self.col_idx.len(),
                got: self.values.len(),
            });
        }
        if self.rhs.len() != self.n_rows {
            return Err(SpmvError::LengthMismatch {
                what: "rhs",
                expected: self.n_rows,
                got: self.rhs.len(),
            });
        }
        if self.row_ptr[0] != 0 {
            return Err(SpmvError::InvalidRowPtr {
                reason: format!("row_ptr[0] is {}, expected 0", self.row_ptr[0]),
            });
        }
        if self.row_ptr[self.n_rows] != self.col_idx.len() {
            return Err(SpmvError::InvalidRowPtr {
                reason: format!(
                    "row_ptr[{}] is {}, expected nnz = {}",
                    self.n_rows,
                    self.row_ptr[self.n_rows],
                    self.col_idx.len()
                ),
            });
        }
        for (row, w) in self.row_ptr.windows(2).enumerate() {
            if w[0] > w[1] {
                return Err(SpmvError::RowPtrNotMonotonic {
                    row,
                    start: w[0],
                    end: w[1],
                });
            }
        }
        if let Some((position, &col)) = self
            .col_idx
            .iter()
            .enumerate()
            .find(|&(_, &col)| col >= self.n_rows)
        {
            return Err(SpmvError::ColumnOutOfBounds {
                position,
                col,
                n_cols: self.n_rows,
            });
        }
        Ok(())
    }

    /// Replaces x, checking its length
    pub fn set_rhs(&mut self, rhs: Vec<T>) -> Result<()> {
        if rhs.len() != self.n_rows {
            return Err(SpmvError::LengthMismatch {
                what: "rhs",
                expected: self.n_rows,
                got: rhs.len(),
            });
        }
        self.rhs = rhs;
        Ok(())
    }

    /// Returns the number of non-zero elements in the matrix
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Range of row i inside `col_idx` / `values`
    pub fn row_range(&self, i: usize) -> Range<usize> {
        self.row_ptr[i]..self.row_ptr[i + 1]
    }

    /// Number of stored entries in row i
    pub fn row_len(&self, i: usize) -> usize {
        self.row_ptr[i + 1] - self.row_ptr[i]
    }

    /// Longest row, the ELLPACK slot width
    pub fn max_row_width(&self) -> usize {
        self.row_ptr
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Returns an iterator over the non-zero elements in row i
    ///
    /// Each item is a tuple (col_idx, value) representing a non-zero element
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, &T)> {
        assert!(i < self.n_rows, "Row index out of bounds");

        let range = self.row_range(i);
        self.col_idx[range.clone()]
            .iter()
            .zip(&self.values[range])
            .map(|(&col, val)| (col, val))
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for SparseMatrixInput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SparseMatrixInput {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_rows)?;
        writeln!(f, "  nnz: {}", self.nnz())?;
        writeln!(f, "  max row width: {}", self.max_row_width())?;

        let max_rows_to_print = 5.min(self.n_rows);
        if max_rows_to_print > 0 {
            writeln!(f, "  content sample:")?;

            for i in 0..max_rows_to_print {
                write!(f, "    row {}: ", i)?;
                let range = self.row_range(i);

                if range.is_empty() {
                    writeln!(f, "(empty)")?;
                } else {
                    let shown = 5.min(range.len());
                    for k in range.start..range.start + shown {
                        write!(f, "({}, {:?}) ", self.col_idx[k], self.values[k])?;
                    }
                    if range.len() > shown {
                        write!(f, "... ({} more)", range.len() - shown)?;
                    }
                    writeln!(f)?;
                }
            }

            if self.n_rows > max_rows_to_print {
                writeln!(f, "    ... ({} more rows)", self.n_rows - max_rows_to_print)?;
            }
        }

        write!(f, "}}")
    }
}
