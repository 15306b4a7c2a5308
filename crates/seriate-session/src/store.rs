// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seriate_core::{SeriateError, SeriesMatrix};

/// Raw upload plus the shrinking view the pipeline refines.
///
/// The active map carries one original id per current working row; filters
/// only ever remove entries, so survivor order and ids are stable for the
/// whole session.
#[derive(Clone, Debug)]
pub struct SeriesStore {
    raw: SeriesMatrix,
    working: SeriesMatrix,
    active_to_original: Vec<usize>,
}

impl SeriesStore {
    /// Ingests an upload. The active map starts as the identity over rows
    /// and the working matrix starts as a copy of the raw one.
    pub fn ingest(rows: &[Vec<f64>]) -> Result<Self, SeriateError> {
        let raw = SeriesMatrix::from_rows(rows)?;
        let active_to_original = (0..raw.n_rows()).collect();
        Ok(Self {
            working: raw.clone(),
            raw,
            active_to_original,
        })
    }

    /// Installs a preprocessed matrix in place of the current working view.
    pub fn set_working(&mut self, matrix: SeriesMatrix) -> Result<(), SeriateError> {
        if matrix.n_rows() != self.active_to_original.len() {
            return Err(SeriateError::shape(format!(
                "working matrix has {} rows, active map has {}",
                matrix.n_rows(),
                self.active_to_original.len()
            )));
        }
        self.working = matrix;
        Ok(())
    }

    /// Keeps only the given active positions, in one atomic pass over the
    /// map and the working matrix. Positions must be strictly ascending.
    pub fn retain_positions(&mut self, positions: &[usize]) -> Result<(), SeriateError> {
        if positions.is_empty() {
            return Err(SeriateError::insufficient_data(
                "a filter stage removed every remaining series",
            ));
        }
        for pair in positions.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SeriateError::shape(format!(
                    "retained positions must be strictly ascending; got {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        if let Some(&last) = positions.last()
            && last >= self.active_to_original.len()
        {
            return Err(SeriateError::shape(format!(
                "retained position {last} out of bounds for {} active rows",
                self.active_to_original.len()
            )));
        }

        let working = self.working.select_rows(positions)?;
        self.active_to_original = positions
            .iter()
            .map(|&pos| self.active_to_original[pos])
            .collect();
        self.working = working;
        Ok(())
    }

    pub fn raw(&self) -> &SeriesMatrix {
        &self.raw
    }

    pub fn working(&self) -> &SeriesMatrix {
        &self.working
    }

    pub fn active_to_original(&self) -> &[usize] {
        &self.active_to_original
    }

    /// Row count of the original upload.
    pub fn original_len(&self) -> usize {
        self.raw.n_rows()
    }
}
