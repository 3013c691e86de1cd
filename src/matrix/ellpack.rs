//! ELLPACK kernel layout
//!
//! Every row is stored in exactly `max_row_width` slots, row-major, so the
//! kernel runs the same trip count for every row. Shorter rows are padded
//! with a zero value and a column index that already belongs to the row,
//! which keeps every read of x in bounds and leaves the dot product
//! unchanged.

use num_traits::Num;
use rayon::ThreadPool;
use tracing::{debug, warn};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, SpmvError};
use crate::kernel::StaticSchedule;
use crate::matrix::SparseMatrixInput;

/// Column used to pad rows that have no entries at all
pub const EMPTY_ROW_PAD_COLUMN: usize = 0;

/// Stored slots per real entry above which the padding is logged as a warning
const FILL_WARN_RATIO: f64 = 4.0;

/// The padded ELLPACK working copy used by the ELLPACK kernel
#[derive(Debug, Clone)]
pub struct EllpackLayout<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Slots per row, the length of the longest input row
    pub max_row_width: usize,

    /// Padded column indices (size: n_rows * max_row_width)
    pub col_pad: Vec<usize>,

    /// Padded values (size: n_rows * max_row_width)
    pub val_pad: Vec<T>,

    /// Number of real (unpadded) entries
    nnz: usize,
}

impl<T> EllpackLayout<T>
where
    T: Copy + Num + Send + Sync,
{
    /// Builds the padded layout from the input on the calling thread
    ///
    /// Rows shorter than `max_row_width` are filled with `(last column of
    /// the row, 0)`. An empty row is filled with `(EMPTY_ROW_PAD_COLUMN, 0)`,
    /// so its result is exactly zero.
    ///
    /// # Errors
    ///
    /// Fails if the input is structurally invalid, if `n_rows *
    /// max_row_width` overflows, or if the padded arrays cannot be
    /// allocated.
    pub fn build(input: &SparseMatrixInput<T>) -> Result<Self> {
        Self::build_on(input, &StaticSchedule::new(1, DEFAULT_CHUNK_SIZE), None)
    }

    /// Builds the padded layout with each row written by the lane that
    /// `schedule` gives it, in parallel when `pool` is set
    ///
    /// # Errors
    ///
    /// Same as [`EllpackLayout::build`].
    pub fn build_on(
        input: &SparseMatrixInput<T>,
        schedule: &StaticSchedule,
        pool: Option<&ThreadPool>,
    ) -> Result<Self> {
        input.validate()?;

        let n_rows = input.n_rows;
        let width = input.max_row_width();
        let padded_len = n_rows
            .checked_mul(width)
            .ok_or(SpmvError::SizeOverflow { n_rows, width })?;
        let offset = |row: usize| row * width;

        let col_pad = schedule.try_init_rows(
            "ELLPACK column indices",
            pool,
            n_rows,
            offset,
            |row, slot| {
                let range = input.row_range(row);
                let j = slot - offset(row);
                if j < range.len() {
                    input.col_idx[range.start + j]
                } else if range.is_empty() {
                    EMPTY_ROW_PAD_COLUMN
                } else {
                    input.col_idx[range.end - 1]
                }
            },
        )?;
        let val_pad = schedule.try_init_rows("ELLPACK values", pool, n_rows, offset, |row, slot| {
            let range = input.row_range(row);
            let j = slot - offset(row);
            if j < range.len() {
                input.values[range.start + j]
            } else {
                T::zero()
            }
        })?;

        let layout = Self {
            n_rows,
            max_row_width: width,
            col_pad,
            val_pad,
            nnz: input.nnz(),
        };

        let fill = layout.fill_ratio();
        debug!(
            n_rows,
            max_row_width = width,
            padded_len,
            nnz = layout.nnz,
            fill_ratio = fill,
            "built ELLPACK layout"
        );
        if fill > FILL_WARN_RATIO {
            warn!(
                fill_ratio = fill,
                "ELLPACK padding dominates storage; row lengths are highly skewed"
            );
        }
        Ok(layout)
    }

    /// Returns the number of real (unpadded) entries
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Total number of slots, padding included
    pub fn padded_len(&self) -> usize {
        self.val_pad.len()
    }

    /// Stored slots per real entry (1.0 means no padding)
    pub fn fill_ratio(&self) -> f64 {
        if self.nnz == 0 {
            return if self.padded_len() == 0 { 1.0 } else { f64::INFINITY };
        }
        self.padded_len() as f64 / self.nnz as f64
    }

    /// The slots of row i as `(columns, values)`
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let start = i * self.max_row_width;
        let end = start + self.max_row_width;
        (&self.col_pad[start..end], &self.val_pad[start..end])
    }

    /// Dot product of row i with x over all slots, padding included
    #[inline]
    pub fn row_dot(&self, i: usize, x: &[T]) -> T {
        let (cols, vals) = self.row(i);

        let mut sum = T::zero();
        for (&col, &val) in cols.iter().zip(vals) {
            sum = sum + val * x[col];
        }
        sum
    }
}
