//! Utilities for converting between the input model and sprs matrices

use num_traits::Num;
use sprs::{CsMat, TriMat};

use crate::error::{Result, SpmvError};
use crate::matrix::SparseMatrixInput;

/// Converts the input matrix to an sprs CsMat in CSR storage
///
/// Goes through triplet form so rows with unsorted or repeated column
/// indices are accepted; repeated entries are summed by sprs.
pub fn to_sprs_csr<T>(input: &SparseMatrixInput<T>) -> CsMat<T>
where
    T: Copy + Num + Default,
{
    let mut rows = Vec::with_capacity(input.nnz());
    for i in 0..input.n_rows {
        rows.extend(std::iter::repeat(i).take(input.row_len(i)));
    }

    let triplets = TriMat::from_triplets(
        (input.n_rows, input.n_rows),
        rows,
        input.col_idx.clone(),
        input.values.clone(),
    );
    triplets.to_csr()
}

/// Converts an sprs matrix to the input model, with x set to all ones
///
/// # Errors
///
/// Fails if the matrix is not square.
pub fn from_sprs_csr<T>(matrix: CsMat<T>) -> Result<SparseMatrixInput<T>>
where
    T: Copy + Num + Default,
{
    let matrix = if matrix.is_csr() {
        matrix
    } else {
        matrix.to_csr()
    };

    let (n_rows, n_cols) = matrix.shape();
    if n_rows != n_cols {
        return Err(SpmvError::NotSquare { n_rows, n_cols });
    }

    let (indptr, indices, data) = matrix.into_raw_storage();
    SparseMatrixInput::from_csr_parts(n_rows, indptr, indices, data)
}
