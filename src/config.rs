//! Benchmark configuration: storage format, threads, repetitions, chunking

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpmvError};

/// Rows per scheduling chunk unless configured otherwise
///
/// The best value depends on the thread count and the matrix structure.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Repetitions of the timed kernel unless configured otherwise
pub const DEFAULT_REPETITIONS: usize = 10;

/// Sparse storage layout used by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Compressed Sparse Row, no padding
    Csr,
    /// Fixed-width rows padded to the longest row
    Ellpack,
}

impl Format {
    /// All supported formats
    pub const ALL: [Format; 2] = [Format::Csr, Format::Ellpack];

    /// Maps a numeric format selector (0 = CSR, 1 = ELLPACK)
    ///
    /// # Errors
    ///
    /// Any other value is an unsupported format.
    pub fn from_selector(selector: u32) -> Result<Self> {
        match selector {
            0 => Ok(Format::Csr),
            1 => Ok(Format::Ellpack),
            other => Err(SpmvError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Lower-case name, as accepted by `from_str`
    pub fn name(&self) -> &'static str {
        match self {
            Format::Csr => "csr",
            Format::Ellpack => "ellpack",
        }
    }
}

impl FromStr for Format {
    type Err = SpmvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csr" => Ok(Format::Csr),
            "ellpack" | "ell" => Ok(Format::Ellpack),
            _ => Err(SpmvError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Csr => write!(f, "CSR"),
            Format::Ellpack => write!(f, "ELLPACK"),
        }
    }
}

/// Configuration for one benchmark run
///
/// Passed explicitly to the kernel entry points; nothing is read from
/// global state.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Storage format
    pub format: Format,

    /// Number of worker threads
    pub n_threads: usize,

    /// Number of timed repetitions
    pub repetitions: usize,

    /// Rows per statically scheduled chunk
    pub chunk_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            format: Format::Csr,
            n_threads: num_cpus::get(),
            repetitions: DEFAULT_REPETITIONS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl BenchConfig {
    /// Creates a validated config with the default chunk size
    pub fn new(format: Format, n_threads: usize, repetitions: usize) -> Result<Self> {
        let config = Self {
            format,
            n_threads,
            repetitions,
            chunk_size: DEFAULT_CHUNK_SIZE,
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a validated config from a textual format selector
    pub fn parse(format: &str, n_threads: usize, repetitions: usize) -> Result<Self> {
        Self::new(format.parse()?, n_threads, repetitions)
    }

    /// Overrides the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Rejects zero thread count, repetition count or chunk size
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("n_threads", self.n_threads),
            ("repetitions", self.repetitions),
            ("chunk_size", self.chunk_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(SpmvError::InvalidConfig {
                    field,
                    reason: "must be a positive integer".to_string(),
                });
            }
        }
        Ok(())
    }
}
