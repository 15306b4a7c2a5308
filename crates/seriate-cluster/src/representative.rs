// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seriate_core::{
    LandmarkConfig, SeriateError, SeriesMatrix, euclidean_distance, find_peaks, find_valleys,
};

use crate::kmeans::{ClusterId, ClusterModel};

/// Peak and valley landmarks of one representative row, index-aligned
/// per kind. Valley heights are depths reported as positive numbers.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkProfile {
    pub peaks: Vec<usize>,
    pub peak_heights: Vec<f64>,
    pub valleys: Vec<usize>,
    pub valley_heights: Vec<f64>,
}

/// Working-row position of the member nearest its cluster centroid.
///
/// Ties go to the lower row position. Fails with `NotFound` for an id that
/// was never minted and `EmptyCluster` for one whose members all moved away
/// in splits.
pub fn closest_to_centroid(
    model: &ClusterModel,
    matrix: &SeriesMatrix,
    cluster_id: ClusterId,
) -> Result<usize, SeriateError> {
    select_member(model, matrix, cluster_id, Extremum::Nearest)
}

/// Working-row position of the member farthest from its cluster centroid.
pub fn farthest_from_centroid(
    model: &ClusterModel,
    matrix: &SeriesMatrix,
    cluster_id: ClusterId,
) -> Result<usize, SeriateError> {
    select_member(model, matrix, cluster_id, Extremum::Farthest)
}

#[derive(Clone, Copy)]
enum Extremum {
    Nearest,
    Farthest,
}

fn select_member(
    model: &ClusterModel,
    matrix: &SeriesMatrix,
    cluster_id: ClusterId,
    extremum: Extremum,
) -> Result<usize, SeriateError> {
    let centroid = model.centroid(cluster_id)?;
    let members = model.members(cluster_id);
    if members.is_empty() {
        return Err(SeriateError::empty_cluster(format!(
            "cluster {cluster_id} has no members"
        )));
    }

    let mut best = members[0];
    let mut best_dist = euclidean_distance(matrix.row(best)?, centroid);
    for &row in &members[1..] {
        let dist = euclidean_distance(matrix.row(row)?, centroid);
        // Strict comparison keeps the lower position on equal distance.
        let better = match extremum {
            Extremum::Nearest => dist < best_dist,
            Extremum::Farthest => dist > best_dist,
        };
        if better {
            best = row;
            best_dist = dist;
        }
    }
    Ok(best)
}

/// Euclidean distance from a working row to an externally supplied
/// reference series of the same length.
pub fn distance_to_reference(row: &[f64], reference: &[f64]) -> Result<f64, SeriateError> {
    if row.len() != reference.len() {
        return Err(SeriateError::shape(format!(
            "reference length {} does not match row length {}",
            reference.len(),
            row.len()
        )));
    }
    Ok(euclidean_distance(row, reference))
}

/// Landmark summary of a representative row, peaks and valleys detected
/// under the same configuration.
pub fn landmark_profile(row: &[f64], config: &LandmarkConfig) -> LandmarkProfile {
    let peaks = find_peaks(row, config);
    let valleys = find_valleys(row, config);
    LandmarkProfile {
        peaks: peaks.positions,
        peak_heights: peaks.heights,
        valleys: valleys.positions,
        valley_heights: valleys.heights,
    }
}
