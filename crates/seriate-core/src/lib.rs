// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for the seriate engine: the error taxonomy, the owned
//! row-major series matrix, the landmark detector, and the verdict vocabulary.

pub mod error;
pub mod landmarks;
pub mod matrix;
pub mod verdict;

pub use error::SeriateError;
pub use landmarks::{LandmarkConfig, Landmarks, find_peaks, find_valleys};
pub use matrix::{SeriesMatrix, euclidean_distance};
pub use verdict::Verdict;
