// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seriate_core::{SeriateError, SeriesMatrix, euclidean_distance};

const DEFAULT_K_NEIGHBORS: usize = 20;
const DEFAULT_CONTAMINATION: f64 = 0.2;

/// Density floor guarding against duplicate rows collapsing reachability
/// distances to zero.
const DENSITY_EPSILON: f64 = 1.0e-10;

/// Configuration for local-outlier-factor flagging.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OutlierConfig {
    /// Neighborhood size for the density estimate.
    pub k_neighbors: usize,
    /// Fraction of rows to flag; `floor(contamination * n)` rows are removed.
    pub contamination: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            k_neighbors: DEFAULT_K_NEIGHBORS,
            contamination: DEFAULT_CONTAMINATION,
        }
    }
}

impl OutlierConfig {
    pub fn validate(&self) -> Result<(), SeriateError> {
        if self.k_neighbors == 0 {
            return Err(SeriateError::shape(
                "OutlierConfig.k_neighbors must be >= 1; got 0",
            ));
        }
        if !self.contamination.is_finite()
            || !(0.0..=0.5).contains(&self.contamination)
        {
            return Err(SeriateError::shape(format!(
                "OutlierConfig.contamination must be in [0.0, 0.5]; got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

/// Flags the rows with the lowest local density ratio.
///
/// Each row's local reachability density over its `k_neighbors` nearest
/// rows (Euclidean distance, ties to the lower index) is compared to the
/// average density of those neighbors; the `floor(contamination * n)` rows
/// with the worst ratio are returned, ascending. The estimate is undefined
/// when `n <= k_neighbors`.
pub fn flag_outliers(
    matrix: &SeriesMatrix,
    config: &OutlierConfig,
) -> Result<Vec<usize>, SeriateError> {
    config.validate()?;

    let n = matrix.n_rows();
    let k = config.k_neighbors;
    if n <= k {
        return Err(SeriateError::insufficient_data(format!(
            "outlier scoring needs more than k_neighbors={k} rows; got {n}"
        )));
    }

    let mut distances = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean_distance(matrix.row(i)?, matrix.row(j)?);
            distances[i * n + j] = d;
            distances[j * n + i] = d;
        }
    }

    // Exactly k nearest neighbors per row, ties broken by lower index.
    let mut neighbors = Vec::with_capacity(n);
    let mut k_distances = vec![0.0_f64; n];
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            distances[i * n + a]
                .total_cmp(&distances[i * n + b])
                .then_with(|| a.cmp(&b))
        });
        order.truncate(k);
        k_distances[i] = distances[i * n + order[k - 1]];
        neighbors.push(order);
    }

    let mut local_density = vec![0.0_f64; n];
    for i in 0..n {
        let reach_sum: f64 = neighbors[i]
            .iter()
            .map(|&o| k_distances[o].max(distances[i * n + o]))
            .sum();
        local_density[i] = 1.0 / (reach_sum / k as f64).max(DENSITY_EPSILON);
    }

    let mut factors = vec![0.0_f64; n];
    for i in 0..n {
        let neighbor_density: f64 =
            neighbors[i].iter().map(|&o| local_density[o]).sum::<f64>() / k as f64;
        factors[i] = neighbor_density / local_density[i];
    }

    let flag_count = (config.contamination * n as f64).floor() as usize;
    let mut ranked: Vec<usize> = (0..n).collect();
    ranked.sort_by(|&a, &b| factors[b].total_cmp(&factors[a]).then_with(|| a.cmp(&b)));
    ranked.truncate(flag_count);
    ranked.sort_unstable();
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::{OutlierConfig, flag_outliers};
    use seriate_core::{SeriateError, SeriesMatrix};

    fn config(k_neighbors: usize, contamination: f64) -> OutlierConfig {
        OutlierConfig {
            k_neighbors,
            contamination,
        }
    }

    fn tight_cluster_with_far_point() -> SeriesMatrix {
        SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.2, 0.1],
            vec![0.1, 0.2],
            vec![0.2, 0.0],
            vec![0.0, 0.2],
            vec![100.0, 100.0],
        ])
        .expect("matrix should build")
    }

    #[test]
    fn defaults_match_documented_values() {
        let default = OutlierConfig::default();
        assert_eq!(default.k_neighbors, 20);
        assert_eq!(default.contamination, 0.2);
        default.validate().expect("default config should be valid");
    }

    #[test]
    fn validate_rejects_zero_k_and_out_of_range_contamination() {
        let err = config(0, 0.2).validate().expect_err("k=0 must fail");
        assert!(err.to_string().contains("k_neighbors"));

        let err = config(5, 0.6).validate().expect_err("c>0.5 must fail");
        assert!(err.to_string().contains("contamination"));

        let err = config(5, f64::NAN)
            .validate()
            .expect_err("NaN contamination must fail");
        assert!(err.to_string().contains("contamination"));
    }

    #[test]
    fn far_point_is_the_flagged_outlier() {
        let matrix = tight_cluster_with_far_point();
        // n=8, floor(0.125 * 8) = 1 flagged row.
        let flagged = flag_outliers(&matrix, &config(3, 0.125)).expect("scoring should succeed");
        assert_eq!(flagged, vec![7]);
    }

    #[test]
    fn zero_contamination_flags_nothing() {
        let matrix = tight_cluster_with_far_point();
        let flagged = flag_outliers(&matrix, &config(3, 0.0)).expect("scoring should succeed");
        assert!(flagged.is_empty());
    }

    #[test]
    fn flagged_positions_are_ascending() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![50.0, -50.0],
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![0.2, 0.1],
            vec![0.1, 0.2],
            vec![0.2, 0.2],
            vec![-50.0, 50.0],
        ])
        .expect("matrix should build");

        // floor(0.25 * 8) = 2: both distant rows, reported ascending.
        let flagged = flag_outliers(&matrix, &config(3, 0.25)).expect("scoring should succeed");
        assert_eq!(flagged, vec![0, 7]);
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ])
        .expect("matrix should build");

        let err = flag_outliers(&matrix, &config(3, 0.2))
            .expect_err("n <= k_neighbors must fail");
        assert!(matches!(err, SeriateError::InsufficientData(_)));
        assert!(err.to_string().contains("k_neighbors=3"));
    }

    #[test]
    fn duplicate_rows_do_not_divide_by_zero() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
        ])
        .expect("matrix should build");

        // All densities hit the floor; ties resolve to the lowest index.
        let flagged = flag_outliers(&matrix, &config(2, 0.2)).expect("scoring should succeed");
        assert_eq!(flagged, vec![0]);
    }
}
