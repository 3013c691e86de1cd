//! # Parallel SpMV kernels
//!
//! Each storage layout implements [`SpmvKernel`]; [`multiply`] runs one
//! y = A·x pass over a fixed-size rayon pool with static row chunking, and
//! [`run_spmv`] builds the layout selected by the configuration and times
//! the configured number of repetitions.
//!
//! Inside [`run_spmv`] the layout is filled on the same pool and schedule
//! as the kernel, and the output is split into lanes once before timing
//! starts.

pub mod schedule;

use num_traits::Num;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, info_span};

use crate::config::{BenchConfig, Format};
use crate::error::Result;
use crate::matrix::{CsrLayout, EllpackLayout, SparseMatrixInput};
use crate::timing::{time_repetitions, TimingRecord};

pub use schedule::{LanePartition, StaticSchedule};

/// A matrix layout that can compute one row of y = A·x
///
/// Implementations must be pure: `row_dot` reads the layout and x only, so
/// rows can be evaluated in any order and on any thread.
pub trait SpmvKernel<T>: Sync {
    /// Storage format of this layout
    fn format(&self) -> Format;

    /// Number of rows (length of y)
    fn n_rows(&self) -> usize;

    /// Number of real nonzeros
    fn nnz(&self) -> usize;

    /// Dot product of row `i` with x
    fn row_dot(&self, i: usize, x: &[T]) -> T;
}

impl<T> SpmvKernel<T> for CsrLayout<T>
where
    T: Copy + Num + Send + Sync,
{
    fn format(&self) -> Format {
        Format::Csr
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn nnz(&self) -> usize {
        CsrLayout::nnz(self)
    }

    #[inline]
    fn row_dot(&self, i: usize, x: &[T]) -> T {
        CsrLayout::row_dot(self, i, x)
    }
}

impl<T> SpmvKernel<T> for EllpackLayout<T>
where
    T: Copy + Num + Send + Sync,
{
    fn format(&self) -> Format {
        Format::Ellpack
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn nnz(&self) -> usize {
        EllpackLayout::nnz(self)
    }

    #[inline]
    fn row_dot(&self, i: usize, x: &[T]) -> T {
        EllpackLayout::row_dot(self, i, x)
    }
}

/// Computes y = A·x once, overwriting every element of `y`
///
/// # Panics
///
/// Panics if `x` or `y` is shorter than the number of rows. Callers that
/// go through [`run_spmv`] get these lengths checked up front.
pub fn multiply<T, K>(
    kernel: &K,
    x: &[T],
    y: &mut [T],
    schedule: &StaticSchedule,
    pool: &ThreadPool,
) where
    T: Copy + Send + Sync,
    K: SpmvKernel<T> + ?Sized,
{
    let n_rows = kernel.n_rows();
    assert!(y.len() >= n_rows, "y shorter than the matrix");

    multiply_into(kernel, x, &mut schedule.partition(&mut y[..n_rows]), pool);
}

/// Computes y = A·x once into a partition built by [`StaticSchedule::partition`]
///
/// The partition can be reused across calls, so repeated products do no
/// allocation.
///
/// # Panics
///
/// Panics if the partition does not cover exactly the rows of the matrix,
/// or if `x` is shorter than the number of rows.
pub fn multiply_into<T, K>(kernel: &K, x: &[T], y: &mut LanePartition<'_, T>, pool: &ThreadPool)
where
    T: Copy + Send + Sync,
    K: SpmvKernel<T> + ?Sized,
{
    let n_rows = kernel.n_rows();
    assert!(x.len() >= n_rows, "x shorter than the matrix");
    assert_eq!(y.n_rows(), n_rows, "output partition does not match the matrix");

    y.assign(pool, |i| kernel.row_dot(i, x));
}

/// Builds a pool with exactly `n_threads` workers
pub fn build_pool(n_threads: usize) -> Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("spmxv-worker-{i}"))
        .build()?;
    Ok(pool)
}

/// Output of one benchmark invocation
#[derive(Debug, Clone)]
pub struct BenchmarkRun<T> {
    /// Format that was measured
    pub format: Format,
    /// y after the last repetition
    pub y: Vec<T>,
    /// Per-repetition and wall timings
    pub timings: TimingRecord,
}

/// Builds the configured layout and runs the timed repetitions
///
/// All validation, layout construction and allocation happen before the
/// first repetition starts; the layout and buffers are dropped when this
/// function returns, on success and on error alike.
///
/// # Errors
///
/// Fails on an invalid configuration, an invalid input, a failed
/// allocation, or a thread pool that cannot be created.
pub fn run_spmv<T>(input: &SparseMatrixInput<T>, config: &BenchConfig) -> Result<BenchmarkRun<T>>
where
    T: Copy + Num + Send + Sync,
{
    config.validate()?;
    input.validate()?;

    let pool = build_pool(config.n_threads)?;
    let schedule = StaticSchedule::new(config.n_threads, config.chunk_size);

    info!(
        format = %config.format,
        n_rows = input.n_rows,
        nnz = input.nnz(),
        threads = config.n_threads,
        chunk_size = config.chunk_size,
        repetitions = config.repetitions,
        "starting SpMV benchmark"
    );

    match config.format {
        Format::Csr => {
            let layout = CsrLayout::build_on(input, &schedule, Some(&pool))?;
            measure(&layout, &input.rhs, &schedule, &pool, config.repetitions)
        }
        Format::Ellpack => {
            let layout = EllpackLayout::build_on(input, &schedule, Some(&pool))?;
            measure(&layout, &input.rhs, &schedule, &pool, config.repetitions)
        }
    }
}

fn measure<T, K>(
    kernel: &K,
    x: &[T],
    schedule: &StaticSchedule,
    pool: &ThreadPool,
    repetitions: usize,
) -> Result<BenchmarkRun<T>>
where
    T: Copy + Num + Send + Sync,
    K: SpmvKernel<T>,
{
    let n_rows = kernel.n_rows();
    let mut y = schedule.try_init_rows("result vector", Some(pool), n_rows, |row| row, |_, _| {
        T::zero()
    })?;

    let timings = {
        let mut lanes = schedule.partition(&mut y);
        let _compute = info_span!("compute", format = %kernel.format()).entered();
        time_repetitions(repetitions, || multiply_into(kernel, x, &mut lanes, pool))?
    };

    debug!(
        format = %kernel.format(),
        wall_seconds = timings.wall.seconds(),
        "timed region finished"
    );

    Ok(BenchmarkRun {
        format: kernel.format(),
        y,
        timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpmvError;

    fn scenario_matrix() -> SparseMatrixInput<f64> {
        SparseMatrixInput::from_rows(
            &[vec![(0, 1.0)], vec![(0, 2.0), (2, 1.0)], vec![(1, 3.0)]],
            vec![1.0; 3],
        )
        .unwrap()
    }

    #[test]
    fn test_run_both_formats() {
        let input = scenario_matrix();
        for format in Format::ALL {
            let config = BenchConfig::new(format, 2, 3).unwrap();
            let run = run_spmv(&input, &config).unwrap();
            assert_eq!(run.format, format);
            assert_eq!(run.y, vec![1.0, 3.0, 3.0]);
            assert_eq!(run.timings.len(), 3);
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let input = scenario_matrix();
        let csr = CsrLayout::build(&input).unwrap();
        let ell = EllpackLayout::build(&input).unwrap();
        let kernels: Vec<&dyn SpmvKernel<f64>> = vec![&csr, &ell];

        let pool = build_pool(1).unwrap();
        let schedule = StaticSchedule::new(1, 1);
        for kernel in kernels {
            let mut y = vec![f64::NAN; 3];
            multiply(kernel, &input.rhs, &mut y, &schedule, &pool);
            assert_eq!(y, vec![1.0, 3.0, 3.0]);
            assert_eq!(kernel.nnz(), 4);
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_build() {
        let input = scenario_matrix();
        let config = BenchConfig {
            n_threads: 0,
            ..BenchConfig::default()
        };
        assert!(matches!(
            run_spmv(&input, &config),
            Err(SpmvError::InvalidConfig { field: "n_threads", .. })
        ));
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut input = scenario_matrix();
        input.rhs.pop();
        let config = BenchConfig::new(Format::Ellpack, 1, 1).unwrap();
        assert!(matches!(
            run_spmv(&input, &config),
            Err(SpmvError::LengthMismatch { what: "rhs", .. })
        ));
    }

    #[test]
    fn test_oversized_repetition_count_is_an_error() {
        let input = SparseMatrixInput::<f64>::identity(2);
        let config = BenchConfig::new(Format::Csr, 1, usize::MAX).unwrap();
        assert!(matches!(
            run_spmv(&input, &config),
            Err(SpmvError::AllocationFailed { what: "timing record", .. })
        ));
    }

    #[test]
    fn test_reused_partition_gives_same_product() {
        let input = scenario_matrix();
        let ell = EllpackLayout::build(&input).unwrap();
        let pool = build_pool(2).unwrap();
        let schedule = StaticSchedule::new(2, 1);
        let mut y = vec![f64::NAN; 3];

        let mut lanes = schedule.partition(&mut y);
        for _ in 0..3 {
            multiply_into(&ell, &input.rhs, &mut lanes, &pool);
        }
        drop(lanes);
        assert_eq!(y, vec![1.0, 3.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "does not match the matrix")]
    fn test_partition_size_mismatch_panics() {
        let input = scenario_matrix();
        let csr = CsrLayout::build(&input).unwrap();
        let pool = build_pool(1).unwrap();
        let mut y = vec![0.0; 2];
        let mut lanes = StaticSchedule::new(1, 1).partition(&mut y);
        multiply_into(&csr, &input.rhs, &mut lanes, &pool);
    }
}
