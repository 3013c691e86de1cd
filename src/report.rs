//! Result checking and performance summaries for a benchmark run

use std::fmt;

use crate::matrix::{reference_spmv, SparseMatrixInput};
use crate::timing::TimingRecord;

/// Relative error below which a result is accepted
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Comparison of a kernel result against the sprs reference product
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCheck {
    /// Largest |y - y_ref|
    pub max_abs_error: f64,
    /// Largest |y - y_ref| / max(|y_ref|, 1)
    pub max_rel_error: f64,
    /// Row where the relative error peaks
    pub worst_row: Option<usize>,
    /// Tolerance applied to the relative error
    pub tolerance: f64,
}

impl ErrorCheck {
    /// Compares `y` with the reference product of `input`
    ///
    /// A length mismatch is reported as an infinite error.
    pub fn compute(input: &SparseMatrixInput<f64>, y: &[f64], tolerance: f64) -> Self {
        let reference = reference_spmv(input);
        Self::compare(y, reference.as_slice().unwrap_or(&[]), tolerance)
    }

    /// Compares two vectors element-wise
    pub fn compare(y: &[f64], reference: &[f64], tolerance: f64) -> Self {
        if y.len() != reference.len() {
            return Self {
                max_abs_error: f64::INFINITY,
                max_rel_error: f64::INFINITY,
                worst_row: None,
                tolerance,
            };
        }

        let mut max_abs_error = 0.0f64;
        let mut max_rel_error = 0.0f64;
        let mut worst_row = None;

        for (row, (&got, &want)) in y.iter().zip(reference).enumerate() {
            let abs = (got - want).abs();
            let rel = abs / want.abs().max(1.0);
            max_abs_error = max_abs_error.max(abs);
            // NaN never compares greater, so treat it explicitly
            if rel > max_rel_error || rel.is_nan() {
                max_rel_error = if rel.is_nan() { f64::INFINITY } else { rel };
                worst_row = Some(row);
            }
        }

        Self {
            max_abs_error,
            max_rel_error,
            worst_row,
            tolerance,
        }
    }

    /// Whether the relative error is within tolerance
    pub fn passed(&self) -> bool {
        self.max_rel_error <= self.tolerance
    }
}

impl fmt::Display for ErrorCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error check")?;
        writeln!(f, "  max abs error: {:.3e}", self.max_abs_error)?;
        write!(f, "  max rel error: {:.3e}", self.max_rel_error)?;
        if let Some(row) = self.worst_row {
            write!(f, " (row {})", row)?;
        }
        writeln!(f)?;
        write!(
            f,
            "  status:        {} (tolerance {:.1e})",
            if self.passed() { "PASSED" } else { "FAILED" },
            self.tolerance
        )
    }
}

/// Timing statistics of a run
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    /// Number of repetitions
    pub repetitions: usize,
    /// Threads used
    pub n_threads: usize,
    /// Nonzeros in the matrix
    pub nnz: usize,
    /// Time across all repetitions, in seconds
    pub wall_seconds: f64,
    /// Fastest repetition, in seconds
    pub min_seconds: f64,
    /// Mean repetition, in seconds
    pub mean_seconds: f64,
    /// Slowest repetition, in seconds
    pub max_seconds: f64,
}

impl PerformanceSummary {
    /// Summarises a timing record; each repetition does `2 * nnz` flops
    pub fn from_timings(timings: &TimingRecord, nnz: usize, n_threads: usize) -> Self {
        let times: Vec<f64> = timings.repetitions.iter().map(|s| s.seconds()).collect();
        let repetitions = times.len();

        let (min_seconds, max_seconds, mean_seconds) = if repetitions == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let min = times.iter().copied().fold(f64::INFINITY, f64::min);
            let max = times.iter().copied().fold(0.0, f64::max);
            let mean = times.iter().sum::<f64>() / repetitions as f64;
            (min, max, mean)
        };

        Self {
            repetitions,
            n_threads,
            nnz,
            wall_seconds: timings.wall.seconds(),
            min_seconds,
            mean_seconds,
            max_seconds,
        }
    }

    /// Floating-point operations per repetition
    pub fn flops_per_repetition(&self) -> f64 {
        2.0 * self.nnz as f64
    }

    /// MFLOP/s of the fastest repetition
    pub fn peak_mflops(&self) -> f64 {
        mflops(self.flops_per_repetition(), self.min_seconds)
    }

    /// MFLOP/s of the mean repetition
    pub fn mean_mflops(&self) -> f64 {
        mflops(self.flops_per_repetition(), self.mean_seconds)
    }
}

fn mflops(flops: f64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        flops / seconds / 1e6
    } else {
        0.0
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Performance")?;
        writeln!(f, "  threads:      {}", self.n_threads)?;
        writeln!(f, "  repetitions:  {}", self.repetitions)?;
        writeln!(f, "  wall time:    {:.6} s", self.wall_seconds)?;
        writeln!(
            f,
            "  per rep:      min {:.6} s, mean {:.6} s, max {:.6} s",
            self.min_seconds, self.mean_seconds, self.max_seconds
        )?;
        write!(
            f,
            "  MFLOP/s:      {:.2} (best), {:.2} (mean)",
            self.peak_mflops(),
            self.mean_mflops()
        )
    }
}
