//! Compressed Sparse Row (CSR) kernel layout

use num_traits::Num;
use rayon::ThreadPool;
use tracing::debug;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::Result;
use crate::kernel::StaticSchedule;
use crate::matrix::SparseMatrixInput;
use crate::utils::try_copy;

/// The CSR working copy used by the CSR kernel
///
/// The CSR format stores a sparse matrix using three arrays:
/// - row_ptr: Array of size n_rows + 1 containing indices into col_idx and values arrays
/// - col_idx: Array of size nnz containing column indices of non-zero elements
/// - values: Array of size nnz containing the non-zero values
///
/// Nothing is padded: each row is read with its own trip count.
#[derive(Debug, Clone)]
pub struct CsrLayout<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Row pointers (size: n_rows + 1)
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz)
    pub col_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<T>,
}

impl<T> CsrLayout<T>
where
    T: Copy + Num + Send + Sync,
{
    /// Copies the input into a CSR layout owned by one kernel invocation
    ///
    /// # Errors
    ///
    /// Fails if the input is structurally invalid or a buffer cannot be
    /// allocated.
    pub fn build(input: &SparseMatrixInput<T>) -> Result<Self> {
        Self::build_on(input, &StaticSchedule::new(1, DEFAULT_CHUNK_SIZE), None)
    }

    /// Copies the input with each row's entries written by the lane that
    /// `schedule` gives the row, in parallel when `pool` is set
    ///
    /// # Errors
    ///
    /// Same as [`CsrLayout::build`].
    pub fn build_on(
        input: &SparseMatrixInput<T>,
        schedule: &StaticSchedule,
        pool: Option<&ThreadPool>,
    ) -> Result<Self> {
        input.validate()?;

        let n_rows = input.n_rows;
        let offset = |row: usize| input.row_ptr[row];
        let layout = Self {
            n_rows,
            row_ptr: try_copy("CSR row pointers", &input.row_ptr)?,
            col_idx: schedule.try_init_rows("CSR column indices", pool, n_rows, offset, |_, k| {
                input.col_idx[k]
            })?,
            values: schedule.try_init_rows("CSR values", pool, n_rows, offset, |_, k| {
                input.values[k]
            })?,
        };

        debug!(
            n_rows = layout.n_rows,
            nnz = layout.nnz(),
            "built CSR layout"
        );
        Ok(layout)
    }

    /// Returns the number of non-zero elements in the matrix
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Dot product of row i with x, in stored nonzero order
    #[inline]
    pub fn row_dot(&self, i: usize, x: &[T]) -> T {
        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];

        let mut sum = T::zero();
        for (&col, &val) in self.col_idx[start..end].iter().zip(&self.values[start..end]) {
            sum = sum + val * x[col];
        }
        sum
    }
}
