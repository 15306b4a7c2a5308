// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SeriateError;

const DEFAULT_MIN_HEIGHT: f64 = 0.1;
const DEFAULT_MIN_SEPARATION: usize = 10;

/// Parameters of the oscillation-landmark detector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkConfig {
    /// Minimum value a local maximum must reach to count.
    pub min_height: f64,
    /// Minimum index gap between two accepted landmarks.
    pub min_separation: usize,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            min_height: DEFAULT_MIN_HEIGHT,
            min_separation: DEFAULT_MIN_SEPARATION,
        }
    }
}

impl LandmarkConfig {
    pub fn validate(&self) -> Result<(), SeriateError> {
        if !self.min_height.is_finite() {
            return Err(SeriateError::shape(format!(
                "LandmarkConfig.min_height must be finite; got {}",
                self.min_height
            )));
        }
        if self.min_separation == 0 {
            return Err(SeriateError::shape(
                "LandmarkConfig.min_separation must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Accepted landmark positions and their heights, index-aligned.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Landmarks {
    pub positions: Vec<usize>,
    pub heights: Vec<f64>,
}

impl Landmarks {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Detects peaks in a row.
///
/// A candidate is a strict interior local maximum whose value reaches
/// `min_height`. Candidates are thinned greedily left to right: one closer
/// than `min_separation` to the last accepted landmark replaces it when
/// higher and is dropped otherwise. Replacement cannot violate the gap to
/// the landmark before last, since positions only move rightward.
pub fn find_peaks(row: &[f64], config: &LandmarkConfig) -> Landmarks {
    let mut accepted: Vec<(usize, f64)> = Vec::new();

    for t in 1..row.len().saturating_sub(1) {
        let value = row[t];
        if !(value > row[t - 1] && value > row[t + 1] && value >= config.min_height) {
            continue;
        }

        match accepted.last_mut() {
            Some((last_pos, last_height)) if t - *last_pos < config.min_separation => {
                if value > *last_height {
                    *last_pos = t;
                    *last_height = value;
                }
            }
            _ => accepted.push((t, value)),
        }
    }

    let (positions, heights) = accepted.into_iter().unzip();
    Landmarks { positions, heights }
}

/// Detects valleys by running the peak detector on the negated row.
///
/// Heights are the negated detector's heights, i.e. depth below zero
/// reported as a positive number.
pub fn find_valleys(row: &[f64], config: &LandmarkConfig) -> Landmarks {
    let negated: Vec<f64> = row.iter().map(|v| -v).collect();
    find_peaks(&negated, config)
}
