//! Synthetic banded matrices and random right-hand sides
//!
//! Generated rows always contain the diagonal, so no row is empty. Every
//! `skew_every`-th row can be widened to `skew_width` entries to stress the
//! ELLPACK padding.

use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{Result, SpmvError};
use crate::matrix::SparseMatrixInput;

/// Shape of a generated matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Rows (and columns)
    pub n_rows: usize,
    /// Entries per regular row
    pub row_width: usize,
    /// Widen every n-th row, starting at row 0
    pub skew_every: Option<usize>,
    /// Entries per widened row
    pub skew_width: usize,
}

impl GeneratorConfig {
    /// Uniform band of `row_width` entries per row
    pub fn banded(n_rows: usize, row_width: usize) -> Self {
        Self {
            n_rows,
            row_width,
            skew_every: None,
            skew_width: row_width,
        }
    }

    /// Adds a widened row every `every` rows
    pub fn with_skew(mut self, every: usize, width: usize) -> Self {
        self.skew_every = Some(every);
        self.skew_width = width;
        self
    }

    fn width_of(&self, row: usize) -> usize {
        let width = match self.skew_every {
            Some(every) if every > 0 && row % every == 0 => self.skew_width,
            _ => self.row_width,
        };
        width.clamp(1, self.n_rows)
    }
}

/// Seeded generator for matrices and vectors
pub struct MatrixGenerator {
    rng: ChaCha8Rng,
}

impl MatrixGenerator {
    /// Creates a generator with a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generates a banded matrix with values in (0, 1] and x set to all ones
    ///
    /// Each row holds a contiguous window of columns around the diagonal,
    /// shifted to stay inside the matrix, in ascending column order.
    pub fn generate(&mut self, config: &GeneratorConfig) -> Result<SparseMatrixInput<f64>> {
        if config.n_rows == 0 {
            return Err(SpmvError::InvalidConfig {
                field: "n_rows",
                reason: "generated matrices need at least one row".to_string(),
            });
        }
        if config.row_width == 0 {
            return Err(SpmvError::InvalidConfig {
                field: "row_width",
                reason: "must be a positive integer".to_string(),
            });
        }

        let n = config.n_rows;
        let dist = Uniform::new_inclusive(f64::EPSILON, 1.0);

        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);

        for row in 0..n {
            let width = config.width_of(row);
            let first = row.saturating_sub(width / 2).min(n - width);
            for col in first..first + width {
                col_idx.push(col);
                values.push(dist.sample(&mut self.rng));
            }
            row_ptr.push(col_idx.len());
        }

        debug!(n_rows = n, nnz = values.len(), "generated banded matrix");
        SparseMatrixInput::from_csr_parts(n, row_ptr, col_idx, values)
    }

    /// Random vector with entries uniform in [0, 1)
    pub fn random_rhs(&mut self, n: usize) -> Vec<f64> {
        let dist = Uniform::new(0.0, 1.0);
        (0..n).map(|_| dist.sample(&mut self.rng)).collect()
    }
}
