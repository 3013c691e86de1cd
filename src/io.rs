//! Matrix Market reader
//!
//! Reads `coordinate` files with `real`, `integer` or `pattern` entries in
//! `general` or `symmetric` storage. Indices are converted from 1-based to
//! 0-based and entries are grouped by row while keeping their file order
//! inside each row.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{Result, SpmvError};
use crate::matrix::SparseMatrixInput;
use crate::utils::{exclusive_scan, try_copy, try_filled};

/// How the value column is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Pattern,
}

/// Matrix Market format reader
pub struct MatrixMarketIO;

impl MatrixMarketIO {
    /// Read a matrix in Matrix Market format; x is set to all ones
    pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<SparseMatrixInput<f64>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let input = Self::parse(BufReader::new(file))?;

        info!(
            path = %path.display(),
            n_rows = input.n_rows,
            nnz = input.nnz(),
            "loaded Matrix Market file"
        );
        Ok(input)
    }

    /// Parse a Matrix Market stream
    pub fn parse<R: BufRead>(reader: R) -> Result<SparseMatrixInput<f64>> {
        let mut field = Field::Real;
        let mut symmetric = false;
        let mut size: Option<(usize, usize, usize)> = None;
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut entries = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();

            if idx == 0 && trimmed.starts_with("%%MatrixMarket") {
                let banner = trimmed.to_ascii_lowercase();
                let parts: Vec<&str> = banner.split_whitespace().collect();
                if parts.len() < 5 || parts[1] != "matrix" || parts[2] != "coordinate" {
                    return Err(parse_error(
                        line_no,
                        "only 'matrix coordinate' files are supported",
                    ));
                }
                field = match parts[3] {
                    "real" | "double" | "integer" => Field::Real,
                    "pattern" => Field::Pattern,
                    other => {
                        return Err(parse_error(line_no, format!("unsupported field '{}'", other)))
                    }
                };
                symmetric = match parts[4] {
                    "general" => false,
                    "symmetric" => true,
                    other => {
                        let reason = format!("unsupported symmetry '{}'", other);
                        return Err(parse_error(line_no, reason));
                    }
                };
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            let Some((n_rows, n_cols, _)) = size else {
                // Size line: rows cols nnz
                if parts.len() != 3 {
                    return Err(parse_error(line_no, "invalid size line"));
                }
                let n_rows = parse_usize(parts[0], line_no, "number of rows")?;
                let n_cols = parse_usize(parts[1], line_no, "number of columns")?;
                let nnz = parse_usize(parts[2], line_no, "number of non-zeros")?;
                if n_rows != n_cols {
                    return Err(SpmvError::NotSquare { n_rows, n_cols });
                }
                let capacity = if symmetric { nnz.saturating_mul(2) } else { nnz };
                triplets
                    .try_reserve_exact(capacity)
                    .map_err(|_| SpmvError::AllocationFailed {
                        what: "Matrix Market entries",
                        bytes: capacity.saturating_mul(std::mem::size_of::<(usize, usize, f64)>()),
                    })?;
                size = Some((n_rows, n_cols, nnz));
                continue;
            };

            let expected = if field == Field::Pattern { 2 } else { 3 };
            if parts.len() < expected {
                return Err(parse_error(line_no, "too few columns in entry"));
            }
            let row = parse_usize(parts[0], line_no, "row index")?;
            let col = parse_usize(parts[1], line_no, "column index")?;
            let row = to_zero_based(row, n_rows, line_no)?;
            let col = to_zero_based(col, n_cols, line_no)?;
            let val = match field {
                Field::Pattern => 1.0,
                Field::Real => parts[2]
                    .parse::<f64>()
                    .map_err(|_| parse_error(line_no, "invalid value"))?,
            };

            entries += 1;
            triplets.push((row, col, val));
            if symmetric && row != col {
                triplets.push((col, row, val));
            }
        }

        let (n_rows, _, nnz) = size.ok_or_else(|| parse_error(0, "missing size line"))?;
        if entries != nnz {
            return Err(parse_error(
                0,
                format!("expected {} entries, found {}", nnz, entries),
            ));
        }

        Self::triplets_to_input(n_rows, &triplets)
    }

    /// Groups triplets by row with a stable counting sort
    fn triplets_to_input(
        n_rows: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<SparseMatrixInput<f64>> {
        let mut counts = try_filled("Matrix Market row counts", n_rows, 0usize)?;
        for &(row, _, _) in triplets {
            counts[row] += 1;
        }

        let row_ptr = exclusive_scan(&counts);
        let mut next = try_copy("Matrix Market row cursors", &row_ptr)?;
        let mut col_idx = try_filled("Matrix Market column indices", triplets.len(), 0usize)?;
        let mut values = try_filled("Matrix Market values", triplets.len(), 0.0f64)?;

        for &(row, col, val) in triplets {
            let pos = next[row];
            col_idx[pos] = col;
            values[pos] = val;
            next[row] += 1;
        }

        SparseMatrixInput::from_csr_parts(n_rows, row_ptr, col_idx, values)
    }
}

fn parse_error(line: usize, reason: impl Into<String>) -> SpmvError {
    SpmvError::Parse {
        line,
        reason: reason.into(),
    }
}

fn parse_usize(token: &str, line: usize, what: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid {}: '{}'", what, token)))
}

fn to_zero_based(index: usize, bound: usize, line: usize) -> Result<usize> {
    if index == 0 || index > bound {
        return Err(parse_error(
            line,
            format!("index {} outside 1..={}", index, bound),
        ));
    }
    Ok(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_general() {
        let text = "%%MatrixMarket matrix coordinate real general\n\
                    % comment\n\
                    3 3 4\n\
                    1 1 1.0\n\
                    2 3 1.0\n\
                    2 1 2.0\n\
                    3 2 3.0\n";
        let input = MatrixMarketIO::parse(Cursor::new(text)).unwrap();

        assert_eq!(input.n_rows, 3);
        assert_eq!(input.row_ptr, vec![0, 1, 3, 4]);
        // File order is kept within row 1
        assert_eq!(input.col_idx, vec![0, 2, 0, 1]);
        assert_eq!(input.values, vec![1.0, 1.0, 2.0, 3.0]);
        assert_eq!(input.rhs, vec![1.0; 3]);
    }

    #[test]
    fn test_parse_symmetric_pattern() {
        let text = "%%MatrixMarket matrix coordinate pattern symmetric\n\
                    2 2 2\n\
                    1 1\n\
                    2 1\n";
        let input = MatrixMarketIO::parse(Cursor::new(text)).unwrap();

        assert_eq!(input.nnz(), 3);
        assert_eq!(input.row_ptr, vec![0, 2, 3]);
        assert_eq!(input.col_idx, vec![0, 1, 0]);
        assert_eq!(input.values, vec![1.0; 3]);
    }

    #[test]
    fn test_parse_without_banner() {
        let input = MatrixMarketIO::parse(Cursor::new("2 2 1\n2 2 5.5\n")).unwrap();
        assert_eq!(input.row_ptr, vec![0, 0, 1]);
        assert_eq!(input.values, vec![5.5]);
    }

    #[test]
    fn test_rejects_non_square() {
        let err = MatrixMarketIO::parse(Cursor::new("2 3 0\n")).unwrap_err();
        assert!(matches!(err, SpmvError::NotSquare { n_rows: 2, n_cols: 3 }));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let err = MatrixMarketIO::parse(Cursor::new("2 2 1\n3 1 1.0\n")).unwrap_err();
        assert!(matches!(err, SpmvError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_rejects_entry_count_mismatch() {
        let err = MatrixMarketIO::parse(Cursor::new("2 2 2\n1 1 1.0\n")).unwrap_err();
        assert!(matches!(err, SpmvError::Parse { .. }));
    }

    #[test]
    fn test_rejects_dense_array_format() {
        let text = "%%MatrixMarket matrix array real general\n2 2\n";
        assert!(MatrixMarketIO::parse(Cursor::new(text)).is_err());
    }

    #[test]
    fn test_oversized_header_is_allocation_error() {
        let err = MatrixMarketIO::triplets_to_input(usize::MAX / 2, &[]).unwrap_err();
        assert!(matches!(
            err,
            SpmvError::AllocationFailed { what: "Matrix Market row counts", .. }
        ));
    }

    #[test]
    fn test_huge_size_line_without_entries_fails_cleanly() {
        let text = format!("{n} {n} 0\n", n = usize::MAX / 2);
        let err = MatrixMarketIO::parse(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, SpmvError::AllocationFailed { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = MatrixMarketIO::read_matrix("/nonexistent/matrix.mtx").unwrap_err();
        assert!(matches!(err, SpmvError::Io(_)));
    }
}
