// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use seriate_core::{SeriateError, SeriesMatrix, euclidean_distance};

const DEFAULT_MAX_ITERATIONS: usize = 50;
const DEFAULT_TOLERANCE: f64 = 1.0e-6;
const DEFAULT_SEED: u64 = 0;

/// Identifier of a cluster; append-only, never reused or renumbered.
pub type ClusterId = usize;

/// Configuration for [`ClusterEngine`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    /// Convergence threshold on the largest centroid move per round.
    pub tolerance: f64,
    /// Seed for the deterministic centroid initialization.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            seed: DEFAULT_SEED,
        }
    }
}

impl KMeansConfig {
    pub fn validate(&self) -> Result<(), SeriateError> {
        if self.max_iterations == 0 {
            return Err(SeriateError::cluster(
                "KMeansConfig.max_iterations must be >= 1; got 0",
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SeriateError::cluster(format!(
                "KMeansConfig.tolerance must be finite and >= 0; got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Deterministic splitmix64 generator used only for centroid seeding.
#[derive(Clone, Copy, Debug)]
struct StableRng {
    state: u64,
}

impl StableRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9e3779b97f4a7c15),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    fn gen_range(&mut self, upper_exclusive: usize) -> Result<usize, SeriateError> {
        if upper_exclusive == 0 {
            return Err(SeriateError::cluster(
                "StableRng.gen_range requires upper_exclusive >= 1; got 0",
            ));
        }
        let sampled = self.next_u64() % upper_exclusive as u64;
        usize::try_from(sampled)
            .map_err(|_| SeriateError::cluster("rng sampled index conversion overflow"))
    }
}

/// A fitted clustering: assignments aligned with the working matrix rows and
/// one centroid per defined cluster id.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterModel {
    assignments: Vec<ClusterId>,
    centroids: Vec<Vec<f64>>,
}

impl ClusterModel {
    /// Cluster id per working row, row order preserved.
    pub fn assignments(&self) -> &[ClusterId] {
        &self.assignments
    }

    /// Number of cluster ids ever minted (fit ids plus one per split).
    pub fn num_cluster_ids(&self) -> usize {
        self.centroids.len()
    }

    /// Number of distinct ids currently assigned to at least one row.
    pub fn cluster_count(&self) -> usize {
        let mut seen = vec![false; self.centroids.len()];
        for &id in &self.assignments {
            seen[id] = true;
        }
        seen.iter().filter(|&&s| s).count()
    }

    /// Ids with at least one member, ascending.
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        let mut seen = vec![false; self.centroids.len()];
        for &id in &self.assignments {
            seen[id] = true;
        }
        seen.iter()
            .enumerate()
            .filter_map(|(id, &s)| s.then_some(id))
            .collect()
    }

    /// Row positions currently assigned to `id`, ascending.
    pub fn members(&self, id: ClusterId) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter_map(|(row, &assigned)| (assigned == id).then_some(row))
            .collect()
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        id < self.centroids.len()
    }

    pub fn centroid(&self, id: ClusterId) -> Result<&[f64], SeriateError> {
        self.centroids
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| SeriateError::not_found(format!("cluster {id} does not exist")))
    }

    /// The id with the most current members; ties go to the lower id.
    /// Recomputed on demand since splits change membership counts.
    pub fn dominant_cluster(&self) -> ClusterId {
        let mut counts = vec![0usize; self.centroids.len()];
        for &id in &self.assignments {
            counts[id] += 1;
        }
        let mut dominant = 0;
        for (id, &count) in counts.iter().enumerate() {
            if count > counts[dominant] {
                dominant = id;
            }
        }
        dominant
    }
}

/// Deterministic Lloyd k-means over whole series under Euclidean distance.
#[derive(Clone, Debug, Default)]
pub struct ClusterEngine {
    config: KMeansConfig,
}

impl ClusterEngine {
    pub fn new(config: KMeansConfig) -> Result<Self, SeriateError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Fits `k` clusters over the matrix rows.
    ///
    /// Ids come out as `0..k`, every id with at least one member. Assignment
    /// ties go to the lower id.
    pub fn fit(&self, matrix: &SeriesMatrix, k: usize) -> Result<ClusterModel, SeriateError> {
        let n = matrix.n_rows();
        if k == 0 {
            return Err(SeriateError::cluster("k must be >= 1; got 0"));
        }
        if k > n {
            return Err(SeriateError::cluster(format!(
                "k={k} exceeds the {n} available rows"
            )));
        }

        let centroids = self.initial_centroids(matrix, k)?;
        let (assignments, centroids) = self.lloyd(matrix, centroids)?;
        Ok(ClusterModel {
            assignments,
            centroids,
        })
    }

    /// Re-clusters the members of `cluster_id` into two sub-clusters.
    ///
    /// Pure: returns a new model, leaving the input untouched. One
    /// sub-cluster keeps `cluster_id`, the other takes the next unused id.
    /// Assignments and centroids outside the target are copied verbatim.
    pub fn split(
        &self,
        model: &ClusterModel,
        matrix: &SeriesMatrix,
        cluster_id: ClusterId,
    ) -> Result<ClusterModel, SeriateError> {
        if !model.contains(cluster_id) {
            return Err(SeriateError::cluster(format!(
                "cluster {cluster_id} does not exist"
            )));
        }
        if model.assignments.len() != matrix.n_rows() {
            return Err(SeriateError::shape(format!(
                "assignment length {} does not match {} matrix rows",
                model.assignments.len(),
                matrix.n_rows()
            )));
        }

        let members = model.members(cluster_id);
        if members.len() < 2 {
            return Err(SeriateError::cluster(format!(
                "cluster {cluster_id} has {} member(s); splitting needs at least 2",
                members.len()
            )));
        }

        let submatrix = matrix.select_rows(&members)?;
        let sub = self.fit(&submatrix, 2)?;

        let new_id = model.num_cluster_ids();
        let mut assignments = model.assignments.clone();
        for (local, &row) in members.iter().enumerate() {
            assignments[row] = if sub.assignments[local] == 0 {
                cluster_id
            } else {
                new_id
            };
        }

        let mut centroids = model.centroids.clone();
        centroids[cluster_id] = sub.centroids[0].clone();
        centroids.push(sub.centroids[1].clone());

        Ok(ClusterModel {
            assignments,
            centroids,
        })
    }

    /// First centroid drawn from the seeded generator, the rest by
    /// farthest-point traversal (ties to the lower row index).
    fn initial_centroids(
        &self,
        matrix: &SeriesMatrix,
        k: usize,
    ) -> Result<Vec<Vec<f64>>, SeriateError> {
        let n = matrix.n_rows();
        let mut rng = StableRng::new(self.config.seed);
        let first = rng.gen_range(n)?;

        let mut centroids = vec![matrix.row(first)?.to_vec()];
        let mut min_sq_dist: Vec<f64> = (0..n)
            .map(|row| {
                let d = euclidean_distance(
                    matrix.row(row).unwrap_or(&[]),
                    &centroids[0],
                );
                d * d
            })
            .collect();

        while centroids.len() < k {
            let mut best_row = 0;
            for row in 1..n {
                if min_sq_dist[row] > min_sq_dist[best_row] {
                    best_row = row;
                }
            }
            let next = matrix.row(best_row)?.to_vec();
            for row in 0..n {
                let d = euclidean_distance(matrix.row(row)?, &next);
                let sq = d * d;
                if sq < min_sq_dist[row] {
                    min_sq_dist[row] = sq;
                }
            }
            centroids.push(next);
        }

        Ok(centroids)
    }

    fn lloyd(
        &self,
        matrix: &SeriesMatrix,
        mut centroids: Vec<Vec<f64>>,
    ) -> Result<(Vec<ClusterId>, Vec<Vec<f64>>), SeriateError> {
        let k = centroids.len();
        let mut assignments = vec![0; matrix.n_rows()];

        for _ in 0..self.config.max_iterations {
            assign_rows(matrix, &centroids, &mut assignments)?;
            fix_empty_clusters(matrix, &centroids, &mut assignments, k)?;
            let updated = compute_centroids(matrix, &assignments, k)?;

            let mut shift = 0.0_f64;
            for (old, new) in centroids.iter().zip(updated.iter()) {
                shift = shift.max(euclidean_distance(old, new));
            }
            centroids = updated;
            if shift <= self.config.tolerance {
                break;
            }
        }

        // Final labels consistent with the final centroids.
        assign_rows(matrix, &centroids, &mut assignments)?;
        fix_empty_clusters(matrix, &centroids, &mut assignments, k)?;
        let centroids = compute_centroids(matrix, &assignments, k)?;
        Ok((assignments, centroids))
    }
}

fn assign_rows(
    matrix: &SeriesMatrix,
    centroids: &[Vec<f64>],
    assignments: &mut [ClusterId],
) -> Result<(), SeriateError> {
    for (row_idx, row) in matrix.rows().enumerate() {
        let mut best_id = 0;
        let mut best_dist = f64::INFINITY;
        for (id, centroid) in centroids.iter().enumerate() {
            let dist = euclidean_distance(row, centroid);
            // Strict comparison keeps the lower id on equal distance.
            if dist < best_dist {
                best_dist = dist;
                best_id = id;
            }
        }
        assignments[row_idx] = best_id;
    }
    Ok(())
}

/// Reassigns, for every memberless id, the row farthest from its own
/// centroid (taken from a cluster that can spare it). With k <= n this
/// always terminates with every id populated.
fn fix_empty_clusters(
    matrix: &SeriesMatrix,
    centroids: &[Vec<f64>],
    assignments: &mut [ClusterId],
    k: usize,
) -> Result<(), SeriateError> {
    let mut counts = vec![0usize; k];
    for &id in assignments.iter() {
        counts[id] += 1;
    }

    for empty_id in 0..k {
        if counts[empty_id] > 0 {
            continue;
        }

        let mut donor_row: Option<usize> = None;
        let mut donor_dist = f64::NEG_INFINITY;
        for (row_idx, row) in matrix.rows().enumerate() {
            let id = assignments[row_idx];
            if counts[id] < 2 {
                continue;
            }
            let dist = euclidean_distance(row, &centroids[id]);
            if dist > donor_dist {
                donor_dist = dist;
                donor_row = Some(row_idx);
            }
        }

        let row_idx = donor_row.ok_or_else(|| {
            SeriateError::cluster(format!(
                "no donor row available to repopulate cluster {empty_id}"
            ))
        })?;
        counts[assignments[row_idx]] -= 1;
        assignments[row_idx] = empty_id;
        counts[empty_id] += 1;
    }

    Ok(())
}

fn compute_centroids(
    matrix: &SeriesMatrix,
    assignments: &[ClusterId],
    k: usize,
) -> Result<Vec<Vec<f64>>, SeriateError> {
    let n_cols = matrix.n_cols();
    let mut sums = vec![vec![0.0_f64; n_cols]; k];
    let mut counts = vec![0usize; k];

    for (row_idx, row) in matrix.rows().enumerate() {
        let id = assignments[row_idx];
        counts[id] += 1;
        for (acc, value) in sums[id].iter_mut().zip(row.iter()) {
            *acc += value;
        }
    }

    for (id, sum) in sums.iter_mut().enumerate() {
        if counts[id] == 0 {
            return Err(SeriateError::empty_cluster(format!(
                "cluster {id} has no members during centroid update"
            )));
        }
        for value in sum.iter_mut() {
            *value /= counts[id] as f64;
        }
    }

    Ok(sums)
}

#[cfg(test)]
mod tests {
    use super::{ClusterEngine, KMeansConfig};
    use seriate_core::{SeriateError, SeriesMatrix};

    fn engine() -> ClusterEngine {
        ClusterEngine::new(KMeansConfig::default()).expect("default config should be valid")
    }

    fn two_blob_matrix() -> SeriesMatrix {
        SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.2, 0.1],
            vec![10.0, 10.0],
            vec![10.2, 10.1],
        ])
        .expect("matrix should build")
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let err = ClusterEngine::new(KMeansConfig {
            max_iterations: 0,
            ..KMeansConfig::default()
        })
        .expect_err("zero iterations must fail");
        assert!(err.to_string().contains("max_iterations"));

        let err = ClusterEngine::new(KMeansConfig {
            tolerance: -1.0,
            ..KMeansConfig::default()
        })
        .expect_err("negative tolerance must fail");
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn fit_rejects_zero_k_and_k_above_row_count() {
        let matrix = two_blob_matrix();
        let err = engine().fit(&matrix, 0).expect_err("k=0 must fail");
        assert!(matches!(err, SeriateError::Cluster(_)));

        let err = engine().fit(&matrix, 5).expect_err("k>n must fail");
        assert!(matches!(err, SeriateError::Cluster(_)));
        assert!(err.to_string().contains("k=5"));
    }

    #[test]
    fn fit_separates_two_obvious_blobs() {
        let matrix = two_blob_matrix();
        let model = engine().fit(&matrix, 2).expect("fit should succeed");

        let a = model.assignments();
        assert_eq!(a.len(), 4);
        assert_eq!(a[0], a[1]);
        assert_eq!(a[2], a[3]);
        assert_ne!(a[0], a[2]);
        assert_eq!(model.cluster_count(), 2);
        assert_eq!(model.cluster_ids(), vec![0, 1]);
    }

    #[test]
    fn fit_is_deterministic_for_a_fixed_seed() {
        let matrix = two_blob_matrix();
        let first = engine().fit(&matrix, 2).expect("first fit should succeed");
        let second = engine().fit(&matrix, 2).expect("second fit should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn every_cluster_is_non_empty_even_with_duplicate_rows() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
        ])
        .expect("matrix should build");
        let model = engine().fit(&matrix, 2).expect("fit should succeed");
        assert_eq!(model.cluster_count(), 2);
        for id in 0..2 {
            assert!(!model.members(id).is_empty(), "cluster {id} must have members");
        }
    }

    #[test]
    fn dominant_cluster_is_the_largest_with_ties_to_the_lower_id() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![50.0, 50.0],
            vec![50.1, 50.0],
        ])
        .expect("matrix should build");
        let model = engine().fit(&matrix, 2).expect("fit should succeed");

        let dominant = model.dominant_cluster();
        assert_eq!(model.members(dominant).len(), 3);

        // Equal-size blobs: the lower id wins.
        let balanced = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![50.0, 50.0],
            vec![50.1, 50.0],
        ])
        .expect("matrix should build");
        let model = engine().fit(&balanced, 2).expect("fit should succeed");
        assert_eq!(model.dominant_cluster(), 0);
    }

    #[test]
    fn split_partitions_only_the_target_and_mints_the_next_id() {
        // Blobs: {0,1} near 0, {2,3} near 10, {4,5} near 100. k=2 merges
        // the first two blobs; the split separates them again.
        let matrix = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.2, 0.0],
            vec![10.0, 10.0],
            vec![10.2, 10.0],
            vec![100.0, 100.0],
            vec![100.2, 100.0],
        ])
        .expect("matrix should build");

        let model = engine().fit(&matrix, 2).expect("fit should succeed");
        let merged_id = model.assignments()[0];
        assert_eq!(model.assignments()[1], merged_id);
        assert_eq!(model.assignments()[2], merged_id);
        assert_eq!(model.assignments()[3], merged_id);
        let far_id = model.assignments()[4];
        assert_ne!(far_id, merged_id);

        let before = model.clone();
        let split = engine()
            .split(&model, &matrix, merged_id)
            .expect("split should succeed");

        // Input model untouched.
        assert_eq!(model, before);

        // Untouched cluster rows keep their assignment.
        assert_eq!(split.assignments()[4], far_id);
        assert_eq!(split.assignments()[5], far_id);

        // Target members partition into {old id, new id}.
        let new_id = model.num_cluster_ids();
        assert_eq!(split.num_cluster_ids(), new_id + 1);
        assert_eq!(split.assignments()[0], split.assignments()[1]);
        assert_eq!(split.assignments()[2], split.assignments()[3]);
        assert_ne!(split.assignments()[0], split.assignments()[2]);
        for row in [0, 1, 2, 3] {
            let id = split.assignments()[row];
            assert!(id == merged_id || id == new_id, "row {row} got id {id}");
        }
        assert_eq!(split.cluster_count(), 3);
    }

    #[test]
    fn split_rejects_unknown_and_undersized_targets() {
        let matrix = two_blob_matrix();
        let model = engine().fit(&matrix, 2).expect("fit should succeed");

        let err = engine()
            .split(&model, &matrix, 9)
            .expect_err("unknown cluster must fail");
        assert!(matches!(err, SeriateError::Cluster(_)));
        assert!(err.to_string().contains("does not exist"));

        // k = n: every cluster is a singleton.
        let singletons = engine().fit(&matrix, 4).expect("fit k=n should succeed");
        assert_eq!(singletons.cluster_count(), 4);
        let err = engine()
            .split(&singletons, &matrix, singletons.assignments()[0])
            .expect_err("singleton split must fail");
        assert!(matches!(err, SeriateError::Cluster(_)));
        assert!(err.to_string().contains("at least 2"));
        // The failed split changed nothing.
        assert_eq!(singletons.cluster_count(), 4);
    }

    #[test]
    fn repeated_splits_grow_the_id_space_append_only() {
        let matrix = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![4.0, 0.0],
            vec![5.0, 0.0],
            vec![6.0, 0.0],
            vec![7.0, 0.0],
        ])
        .expect("matrix should build");

        let mut model = engine().fit(&matrix, 2).expect("fit should succeed");
        let mut expected_ids = 2;
        for _ in 0..3 {
            let target = model.dominant_cluster();
            if model.members(target).len() < 2 {
                break;
            }
            let next = engine()
                .split(&model, &matrix, target)
                .expect("split should succeed");
            expected_ids += 1;
            assert_eq!(next.num_cluster_ids(), expected_ids);
            // Total assigned rows never changes.
            assert_eq!(next.assignments().len(), 8);
            model = next;
        }
    }

    #[test]
    fn centroid_lookup_fails_for_unknown_ids() {
        let model = engine()
            .fit(&two_blob_matrix(), 2)
            .expect("fit should succeed");
        let err = model.centroid(7).expect_err("unknown id must fail");
        assert!(matches!(err, SeriateError::NotFound(_)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn kmeans_config_serde_roundtrip() {
        let config = KMeansConfig {
            max_iterations: 25,
            tolerance: 1.0e-4,
            seed: 7,
        };
        let encoded = serde_json::to_string(&config).expect("config should serialize");
        let decoded: KMeansConfig =
            serde_json::from_str(&encoded).expect("config should deserialize");
        assert_eq!(decoded, config);
    }
}
