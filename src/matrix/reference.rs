//! Reference SpMV used to check the kernels
//!
//! The reference goes through sprs and ndarray, sharing no code with the
//! CSR and ELLPACK kernels, so it is an independent baseline.

use ndarray::Array1;

use crate::matrix::SparseMatrixInput;
use crate::utils::to_sprs_csr;

/// Computes y = A·x with sprs, sequentially
pub fn reference_spmv(input: &SparseMatrixInput<f64>) -> Array1<f64> {
    let a = to_sprs_csr(input);
    let x = Array1::from(input.rhs.clone());
    &a * &x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_spmv() {
        //    [1 2 0]   [1]   [5]
        //    [0 3 0] * [2] = [6]
        //    [4 0 5]   [3]   [19]
        let input = SparseMatrixInput::new(
            3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();

        let y = reference_spmv(&input);
        assert_eq!(y.to_vec(), vec![5.0, 6.0, 19.0]);
    }

    #[test]
    fn test_identity_reference() {
        let mut input = SparseMatrixInput::<f64>::identity(4);
        input.set_rhs(vec![3.0, 1.0, 4.0, 1.5]).unwrap();
        assert_eq!(reference_spmv(&input).to_vec(), vec![3.0, 1.0, 4.0, 1.5]);
    }
}
