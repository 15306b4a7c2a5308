// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Row filters applied between preprocessing and clustering: the shape
//! filter keeps rows that oscillate enough, the outlier filter drops rows
//! whose local density is anomalously low.

pub mod lof;
pub mod shape;

pub use lof::{OutlierConfig, flag_outliers};
pub use shape::{ShapeFilterConfig, count_landmarks, retained_positions};
