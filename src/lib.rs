//! # spmxv: parallel SpMV in CSR and ELLPACK layouts
//!
//! spmxv measures sparse matrix-vector multiplication (y = A·x) on
//! shared-memory multicore machines under two storage layouts:
//!
//! - **CSR**: row pointers plus per-nonzero (column, value) pairs, no padding
//! - **ELLPACK**: every row padded to the longest row, uniform stride
//!
//! ## Components
//!
//! 1. **Input model** ([`SparseMatrixInput`]): validated row-compressed matrix and x.
//! 2. **Layout builders** ([`CsrLayout`], [`EllpackLayout`]): per-invocation working copies.
//! 3. **Parallel kernel** ([`multiply`], [`StaticSchedule`]): rows in fixed-size
//!    chunks, assigned round-robin to a fixed-size rayon pool.
//! 4. **Timing harness** ([`time_repetitions`]): begin/end per repetition plus a wall span.
//! 5. **Reporting** ([`ErrorCheck`], [`PerformanceSummary`]).
//!
//! ## Usage
//!
//! ```
//! use spmxv::{run_spmv, BenchConfig, Format, SparseMatrixInput};
//!
//! let input = SparseMatrixInput::from_rows(
//!     &[vec![(0, 1.0)], vec![(0, 2.0), (2, 1.0)], vec![(1, 3.0)]],
//!     vec![1.0; 3],
//! )
//! .unwrap();
//!
//! let config = BenchConfig::new(Format::Ellpack, 2, 5).unwrap();
//! let run = run_spmv(&input, &config).unwrap();
//!
//! assert_eq!(run.y, vec![1.0, 3.0, 3.0]);
//! assert_eq!(run.timings.len(), 5);
//! ```

pub mod config;
pub mod error;
pub mod generate;
pub mod io;
pub mod kernel;
pub mod matrix;
pub mod report;
pub mod timing;
pub mod utils;

// Re-export primary components
pub use config::{BenchConfig, Format, DEFAULT_CHUNK_SIZE, DEFAULT_REPETITIONS};
pub use error::{Result, SpmvError};
pub use generate::{GeneratorConfig, MatrixGenerator};
pub use io::MatrixMarketIO;
pub use kernel::{
    build_pool, multiply, multiply_into, run_spmv, BenchmarkRun, LanePartition, SpmvKernel,
    StaticSchedule,
};
pub use matrix::{reference_spmv, CsrLayout, EllpackLayout, SparseMatrixInput};
pub use report::{ErrorCheck, PerformanceSummary, DEFAULT_TOLERANCE};
pub use timing::{time_repetitions, Timespan, TimingRecord};
pub use utils::{from_sprs_csr, to_sprs_csr};

/// Version information for the spmxv library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
