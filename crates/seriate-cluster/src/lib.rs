// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Time-series clustering: a seeded, deterministic k-means engine over whole
//! series (each series is one point in D-dimensional space), interactive
//! cluster splitting, and representative-row selection.

pub mod kmeans;
pub mod representative;

pub use kmeans::{ClusterEngine, ClusterId, ClusterModel, KMeansConfig};
pub use representative::{
    LandmarkProfile, closest_to_centroid, distance_to_reference, farthest_from_centroid,
    landmark_profile,
};
