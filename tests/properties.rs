//! Property tests over randomly shaped matrices

use proptest::prelude::*;
use spmxv::{
    reference_spmv, run_spmv, BenchConfig, EllpackLayout, Format, SparseMatrixInput,
};

/// Random square matrix with rows of 0..=max_width entries (empty rows and
/// repeated columns included) plus a matching x.
fn arb_input(max_rows: usize, max_width: usize) -> impl Strategy<Value = SparseMatrixInput<f64>> {
    (1..=max_rows).prop_flat_map(move |n| {
        let row = prop::collection::vec((0..n, -10.0f64..10.0), 0..=max_width);
        (
            prop::collection::vec(row, n),
            prop::collection::vec(-5.0f64..5.0, n),
        )
            .prop_map(|(rows, rhs)| SparseMatrixInput::from_rows(&rows, rhs).unwrap())
    })
}

fn max_rel_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs() / y.abs().max(1.0))
        .fold(0.0, f64::max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn row_ptr_invariants_hold(input in arb_input(40, 12)) {
        prop_assert_eq!(input.row_ptr[0], 0);
        prop_assert_eq!(input.row_ptr[input.n_rows], input.nnz());
        prop_assert!(input.row_ptr.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn ellpack_padding_is_inert(input in arb_input(40, 12)) {
        let ell = EllpackLayout::build(&input).unwrap();

        for i in 0..input.n_rows {
            let len = input.row_len(i);
            prop_assert!(ell.max_row_width >= len);

            let (cols, vals) = ell.row(i);
            prop_assert_eq!(&cols[..len], &input.col_idx[input.row_range(i)]);
            for j in len..ell.max_row_width {
                prop_assert_eq!(vals[j], 0.0);
                prop_assert!(cols[j] < input.n_rows);
            }
        }
    }

    #[test]
    fn formats_agree_with_reference(
        input in arb_input(60, 16),
        threads in 1usize..6,
        chunk_size in 1usize..20,
    ) {
        let reference = reference_spmv(&input).to_vec();

        for format in Format::ALL {
            let config = BenchConfig::new(format, threads, 2).unwrap().with_chunk_size(chunk_size);
            let run = run_spmv(&input, &config).unwrap();
            prop_assert!(max_rel_diff(&run.y, &reference) < 1e-9);
        }
    }
}
