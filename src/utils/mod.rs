//! Utility functions and helpers

pub mod formats;

pub use formats::{from_sprs_csr, to_sprs_csr};

use crate::error::{Result, SpmvError};

/// Computes an exclusive prefix sum (scan) for a vector
///
/// The output has one more element than the input and starts at 0,
/// which is exactly the shape of a CSR row pointer built from row counts.
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0);

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}

/// Allocates an empty vector with room for `len` elements, reporting
/// allocation failure as an error instead of aborting.
pub fn try_with_capacity<T>(what: &'static str, len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| SpmvError::AllocationFailed {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(buf)
}

/// Fallible `vec![value; len]`
pub fn try_filled<T: Copy>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = try_with_capacity(what, len)?;
    buf.resize(len, value);
    Ok(buf)
}

/// Fallible `src.to_vec()`
pub fn try_copy<T: Copy>(what: &'static str, src: &[T]) -> Result<Vec<T>> {
    let mut buf = try_with_capacity(what, src.len())?;
    buf.extend_from_slice(src);
    Ok(buf)
}
