// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Preprocessing for uploaded series: each row is replaced by its discrete
//! time derivative, then every column is standardized to zero mean and unit
//! variance. Both steps are pure; they build new matrices.

use seriate_core::{SeriateError, SeriesMatrix};

/// Replaces each row with its discrete derivative along the time axis.
///
/// Interior timesteps use central differences, the two boundary timesteps
/// use one-sided differences, so the shape is preserved. Requires at least
/// two columns.
pub fn time_gradient(matrix: &SeriesMatrix) -> Result<SeriesMatrix, SeriateError> {
    let n_cols = matrix.n_cols();
    if n_cols < 2 {
        return Err(SeriateError::shape(format!(
            "time gradient requires at least 2 timesteps per row; got {n_cols}"
        )));
    }

    let mut values = Vec::with_capacity(matrix.n_rows() * n_cols);
    for row in matrix.rows() {
        values.push(row[1] - row[0]);
        for t in 1..n_cols - 1 {
            values.push((row[t + 1] - row[t - 1]) / 2.0);
        }
        values.push(row[n_cols - 1] - row[n_cols - 2]);
    }

    SeriesMatrix::new(values, matrix.n_rows(), n_cols)
}

/// Mean-centers every column and scales it to unit standard deviation.
///
/// Uses the population standard deviation. A zero-variance column is a hard
/// error, never a silent division.
pub fn standardize_columns(matrix: &SeriesMatrix) -> Result<SeriesMatrix, SeriateError> {
    let n_rows = matrix.n_rows();
    let n_cols = matrix.n_cols();
    let values = matrix.values();

    let mut means = vec![0.0_f64; n_cols];
    for row in 0..n_rows {
        for col in 0..n_cols {
            means[col] += values[row * n_cols + col];
        }
    }
    for mean in &mut means {
        *mean /= n_rows as f64;
    }

    let mut stds = vec![0.0_f64; n_cols];
    for row in 0..n_rows {
        for col in 0..n_cols {
            let dev = values[row * n_cols + col] - means[col];
            stds[col] += dev * dev;
        }
    }
    for (col, std) in stds.iter_mut().enumerate() {
        *std = (*std / n_rows as f64).sqrt();
        if *std <= 0.0 {
            return Err(SeriateError::degenerate_column(format!(
                "column {col} has zero standard deviation"
            )));
        }
    }

    let mut out = Vec::with_capacity(values.len());
    for row in 0..n_rows {
        for col in 0..n_cols {
            out.push((values[row * n_cols + col] - means[col]) / stds[col]);
        }
    }

    SeriesMatrix::new(out, n_rows, n_cols)
}

/// The full preprocessing step: derivative, then standardization.
pub fn derive_and_standardize(matrix: &SeriesMatrix) -> Result<SeriesMatrix, SeriateError> {
    standardize_columns(&time_gradient(matrix)?)
}
