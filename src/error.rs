//! Error types for spmxv

use thiserror::Error;

/// Result type alias using spmxv's Error
pub type Result<T> = std::result::Result<T, SpmvError>;

/// Errors that can occur while preparing or running an SpMV benchmark
///
/// Every variant is raised before the timed region starts; the multiply
/// loop itself has no failure paths.
#[derive(Error, Debug)]
pub enum SpmvError {
    /// `row_ptr` has the wrong length or wrong end points
    #[error("Invalid row pointer array: {reason}")]
    InvalidRowPtr {
        /// What is wrong with it
        reason: String,
    },

    /// `row_ptr` decreases between two consecutive rows
    #[error("Row pointers decrease at row {row}: {start} > {end}")]
    RowPtrNotMonotonic {
        /// Row whose range is reversed
        row: usize,
        /// row_ptr[row]
        start: usize,
        /// row_ptr[row + 1]
        end: usize,
    },

    /// A column index does not address a valid entry of x
    #[error("Column index {col} at nonzero {position} out of bounds (n_cols = {n_cols})")]
    ColumnOutOfBounds {
        /// Position in col_idx
        position: usize,
        /// The offending column
        col: usize,
        /// Number of columns
        n_cols: usize,
    },

    /// Two arrays that must have matching lengths do not
    #[error("Length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        /// Which array
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Matrix is not square
    #[error("Matrix must be square, got {n_rows} x {n_cols}")]
    NotSquare {
        /// Rows
        n_rows: usize,
        /// Columns
        n_cols: usize,
    },

    /// Format selector names neither CSR nor ELLPACK
    #[error("Unsupported matrix format '{0}' (expected 'csr' or 'ellpack')")]
    UnsupportedFormat(String),

    /// Bad benchmark configuration
    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfig {
        /// Configuration field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Padded layout size does not fit in usize
    #[error("Layout size overflows: {n_rows} rows x {width} slots")]
    SizeOverflow {
        /// Rows
        n_rows: usize,
        /// Slots per row
        width: usize,
    },

    /// Allocation of a working buffer failed
    #[error("Out of memory: failed to allocate {bytes} bytes for {what}")]
    AllocationFailed {
        /// Buffer name
        what: &'static str,
        /// Requested size in bytes
        bytes: usize,
    },

    /// Worker pool could not be created
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O failure while reading a matrix file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed matrix file
    #[error("Parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What could not be parsed
        reason: String,
    },
}
