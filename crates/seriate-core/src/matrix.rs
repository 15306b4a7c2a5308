// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SeriateError;

/// Owned row-major numeric matrix: one row per series, one column per
/// timestep. Immutable after construction; pipeline stages build new
/// matrices rather than editing in place.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesMatrix {
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl SeriesMatrix {
    /// Constructs a validated matrix from a flat row-major buffer.
    pub fn new(values: Vec<f64>, n_rows: usize, n_cols: usize) -> Result<Self, SeriateError> {
        if n_rows == 0 {
            return Err(SeriateError::shape("n_rows must be >= 1"));
        }
        if n_cols == 0 {
            return Err(SeriateError::shape("n_cols must be >= 1"));
        }

        let expected_len = n_rows
            .checked_mul(n_cols)
            .ok_or_else(|| SeriateError::shape("n_rows*n_cols overflow while validating shape"))?;
        if values.len() != expected_len {
            return Err(SeriateError::shape(format!(
                "value length mismatch: got {}, expected {expected_len} (n_rows={n_rows}, n_cols={n_cols})",
                values.len()
            )));
        }

        Ok(Self {
            values,
            n_rows,
            n_cols,
        })
    }

    /// Builds a matrix from uploaded rows, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, SeriateError> {
        let Some(first) = rows.first() else {
            return Err(SeriateError::shape("upload contained no rows"));
        };

        let n_cols = first.len();
        if n_cols == 0 {
            return Err(SeriateError::shape("rows must have at least one column"));
        }

        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(SeriateError::shape(format!(
                    "row {idx} has length {}, expected {n_cols}",
                    row.len()
                )));
            }
            values.extend_from_slice(row);
        }

        Self::new(values, rows.len(), n_cols)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Borrows row `idx`; panics are avoided by returning a shape error.
    pub fn row(&self, idx: usize) -> Result<&[f64], SeriateError> {
        if idx >= self.n_rows {
            return Err(SeriateError::shape(format!(
                "row index {idx} out of bounds for {} rows",
                self.n_rows
            )));
        }
        let start = idx * self.n_cols;
        Ok(&self.values[start..start + self.n_cols])
    }

    /// Iterates rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.n_cols)
    }

    /// Copies the matrix out as owned rows, for serialization boundaries.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }

    /// Builds a new matrix containing the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self, SeriateError> {
        if indices.is_empty() {
            return Err(SeriateError::shape("row selection must not be empty"));
        }

        let mut values = Vec::with_capacity(indices.len() * self.n_cols);
        for &idx in indices {
            values.extend_from_slice(self.row(idx)?);
        }
        Self::new(values, indices.len(), self.n_cols)
    }
}

/// Euclidean distance between two equally sized vectors.
///
/// Callers guarantee equal lengths; the shorter length wins on mismatch so
/// the function stays total.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::{SeriesMatrix, euclidean_distance};
    use crate::SeriateError;

    #[test]
    fn from_rows_builds_row_major_matrix() {
        let matrix = SeriesMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .expect("rectangular rows should build");
        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.n_cols(), 3);
        assert_eq!(matrix.row(1).expect("row 1 exists"), &[4.0, 5.0, 6.0]);
        assert_eq!(matrix.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn from_rows_rejects_ragged_and_empty_input() {
        let ragged = SeriesMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]])
            .expect_err("ragged rows must fail");
        assert!(matches!(ragged, SeriateError::Shape(_)));
        assert!(ragged.to_string().contains("row 1 has length 1"));

        let empty = SeriesMatrix::from_rows(&[]).expect_err("empty upload must fail");
        assert!(empty.to_string().contains("no rows"));

        let zero_cols =
            SeriesMatrix::from_rows(&[vec![]]).expect_err("zero-length rows must fail");
        assert!(zero_cols.to_string().contains("at least one column"));
    }

    #[test]
    fn new_rejects_length_mismatch_and_zero_dims() {
        let err = SeriesMatrix::new(vec![1.0, 2.0, 3.0], 2, 2)
            .expect_err("length mismatch must fail");
        assert!(err.to_string().contains("value length mismatch"));

        let err = SeriesMatrix::new(vec![], 0, 1).expect_err("n_rows=0 must fail");
        assert!(err.to_string().contains("n_rows must be >= 1"));

        let err = SeriesMatrix::new(vec![], 1, 0).expect_err("n_cols=0 must fail");
        assert!(err.to_string().contains("n_cols must be >= 1"));
    }

    #[test]
    fn row_out_of_bounds_is_a_shape_error() {
        let matrix = SeriesMatrix::from_rows(&[vec![1.0, 2.0]]).expect("matrix should build");
        let err = matrix.row(1).expect_err("row 1 does not exist");
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn select_rows_preserves_requested_order() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
        ])
        .expect("matrix should build");

        let selected = matrix.select_rows(&[2, 0]).expect("selection should build");
        assert_eq!(selected.n_rows(), 2);
        assert_eq!(selected.row(0).expect("row 0"), &[2.0, 2.0]);
        assert_eq!(selected.row(1).expect("row 1"), &[0.0, 0.0]);

        let err = matrix
            .select_rows(&[])
            .expect_err("empty selection must fail");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn euclidean_distance_matches_hand_computation() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }
}
