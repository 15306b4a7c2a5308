// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seriate_core::{LandmarkConfig, SeriateError, SeriesMatrix, find_peaks};

const DEFAULT_MIN_LANDMARKS: usize = 4;

/// Configuration for the oscillation-shape filter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeFilterConfig {
    pub landmarks: LandmarkConfig,
    /// A row survives iff its landmark count reaches this threshold.
    pub min_landmarks: usize,
}

impl Default for ShapeFilterConfig {
    fn default() -> Self {
        Self {
            landmarks: LandmarkConfig::default(),
            min_landmarks: DEFAULT_MIN_LANDMARKS,
        }
    }
}

impl ShapeFilterConfig {
    pub fn validate(&self) -> Result<(), SeriateError> {
        self.landmarks.validate()
    }
}

/// Counts accepted landmarks in one row.
pub fn count_landmarks(row: &[f64], config: &LandmarkConfig) -> usize {
    find_peaks(row, config).len()
}

/// Positions (ascending) of rows whose landmark count reaches the threshold.
///
/// Applied to the standardized-derivative matrix, not the raw upload.
pub fn retained_positions(matrix: &SeriesMatrix, config: &ShapeFilterConfig) -> Vec<usize> {
    matrix
        .rows()
        .enumerate()
        .filter(|(_, row)| count_landmarks(row, &config.landmarks) >= config.min_landmarks)
        .map(|(position, _)| position)
        .collect()
}
