// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use seriate_cluster::{
    ClusterEngine, ClusterId, ClusterModel, KMeansConfig, LandmarkProfile, closest_to_centroid,
    distance_to_reference, farthest_from_centroid, landmark_profile,
};
use seriate_core::{SeriateError, Verdict};
use seriate_filter::{OutlierConfig, ShapeFilterConfig, flag_outliers, retained_positions};
use seriate_preprocess::derive_and_standardize;

use crate::labels::LabelStore;
use crate::store::SeriesStore;

const DEFAULT_N_CLUSTERS: usize = 3;

/// Tunables for one analysis session. The landmark detector settings live
/// inside `shape` and are shared with the representative profiles.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// k for the initial fit.
    pub n_clusters: usize,
    pub shape: ShapeFilterConfig,
    pub outlier: OutlierConfig,
    pub kmeans: KMeansConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_clusters: DEFAULT_N_CLUSTERS,
            shape: ShapeFilterConfig::default(),
            outlier: OutlierConfig::default(),
            kmeans: KMeansConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SeriateError> {
        if self.n_clusters == 0 {
            return Err(SeriateError::cluster(
                "SessionConfig.n_clusters must be >= 1; got 0",
            ));
        }
        self.shape.validate()?;
        self.outlier.validate()?;
        self.kmeans.validate()
    }
}

/// Result of a successful upload: which series became the frozen reference
/// and what its landmarks look like.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct UploadSummary {
    pub reference_original_id: usize,
    pub reference_profile: LandmarkProfile,
    pub retained_rows: usize,
    pub cluster_count: usize,
}

/// Representative nearest its cluster centroid, reported by working-row
/// position.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ClosestReport {
    pub active_index: usize,
    pub profile: LandmarkProfile,
    pub distance_to_reference: f64,
}

/// Representative farthest from its cluster centroid, reported by original
/// id. The wire shape keeps the id optional.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FarthestReport {
    pub original_id: Option<usize>,
    pub profile: LandmarkProfile,
    pub distance_to_reference: f64,
}

/// Full verdict state, projected back onto the original upload.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct VerdictReport {
    /// Verdict per cluster id, including ids emptied by later splits.
    pub verdicts: Vec<Verdict>,
    /// Current cluster id per original id; `None` for filtered-out rows.
    pub cluster_by_original: Vec<Option<ClusterId>>,
    /// Current cluster's verdict per original id; `None` for filtered rows.
    pub verdict_by_original: Vec<Option<Verdict>>,
    /// Ids with at least one member, ascending.
    pub live_cluster_ids: Vec<ClusterId>,
}

/// Everything an upload produces, swapped in as one unit.
#[derive(Clone, Debug)]
struct PipelineState {
    store: SeriesStore,
    model: ClusterModel,
    labels: LabelStore,
    reference_row: Vec<f64>,
    reference_original_id: usize,
}

/// One analyst's stateful clustering session.
///
/// Holds at most one fitted pipeline; `upload` replaces it wholesale and
/// every other operation requires it. Failures never leave partial state:
/// a failing upload keeps the previous pipeline, a failing split keeps the
/// previous model and labels.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    engine: ClusterEngine,
    state: Option<PipelineState>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, SeriateError> {
        config.validate()?;
        let engine = ClusterEngine::new(config.kmeans.clone())?;
        Ok(Self {
            config,
            engine,
            state: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Runs the full pipeline on a fresh upload and replaces the session
    /// state atomically.
    pub fn upload(&mut self, rows: &[Vec<f64>]) -> Result<UploadSummary, SeriateError> {
        let state = self.build_state(rows)?;

        let reference_profile =
            landmark_profile(&state.reference_row, &self.config.shape.landmarks);
        let summary = UploadSummary {
            reference_original_id: state.reference_original_id,
            reference_profile,
            retained_rows: state.store.working().n_rows(),
            cluster_count: state.model.cluster_count(),
        };

        info!(
            uploaded = rows.len(),
            retained = summary.retained_rows,
            clusters = summary.cluster_count,
            reference = summary.reference_original_id,
            "session refitted from upload"
        );
        self.state = Some(state);
        Ok(summary)
    }

    fn build_state(&self, rows: &[Vec<f64>]) -> Result<PipelineState, SeriateError> {
        let mut store = SeriesStore::ingest(rows)?;

        let preprocessed = derive_and_standardize(store.raw())?;
        store.set_working(preprocessed)?;

        let oscillating = retained_positions(store.working(), &self.config.shape);
        debug!(
            before = store.working().n_rows(),
            after = oscillating.len(),
            "shape filter"
        );
        store.retain_positions(&oscillating)?;

        let flagged = flag_outliers(store.working(), &self.config.outlier)?;
        let survivors: Vec<usize> = (0..store.working().n_rows())
            .filter(|pos| !flagged.contains(pos))
            .collect();
        debug!(
            before = store.working().n_rows(),
            after = survivors.len(),
            "outlier filter"
        );
        store.retain_positions(&survivors)?;

        let model = self.engine.fit(store.working(), self.config.n_clusters)?;

        let dominant = model.dominant_cluster();
        let reference_active = closest_to_centroid(&model, store.working(), dominant)?;
        let reference_row = store.working().row(reference_active)?.to_vec();
        let reference_original_id = store.active_to_original()[reference_active];

        let labels = LabelStore::new(model.num_cluster_ids());
        Ok(PipelineState {
            store,
            model,
            labels,
            reference_row,
            reference_original_id,
        })
    }

    /// Splits one cluster into two. The failed case leaves the model and the
    /// verdict array exactly as they were.
    pub fn split(&mut self, cluster_id: ClusterId) -> Result<(), SeriateError> {
        let engine = &self.engine;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| SeriateError::not_fitted("upload a dataset first"))?;
        let next = engine.split(&state.model, state.store.working(), cluster_id)?;
        state.labels.grow(next.num_cluster_ids());
        state.model = next;
        debug!(
            cluster = cluster_id,
            clusters = state.model.cluster_count(),
            "cluster split"
        );
        Ok(())
    }

    pub fn cluster_count(&self) -> Result<usize, SeriateError> {
        Ok(self.state()?.model.cluster_count())
    }

    pub fn closest(&self, cluster_id: ClusterId) -> Result<ClosestReport, SeriateError> {
        let state = self.state()?;
        let active_index = closest_to_centroid(&state.model, state.store.working(), cluster_id)?;
        let row = state.store.working().row(active_index)?;
        Ok(ClosestReport {
            active_index,
            profile: landmark_profile(row, &self.config.shape.landmarks),
            distance_to_reference: distance_to_reference(row, &state.reference_row)?,
        })
    }

    pub fn farthest(&self, cluster_id: ClusterId) -> Result<FarthestReport, SeriateError> {
        let state = self.state()?;
        let active_index = farthest_from_centroid(&state.model, state.store.working(), cluster_id)?;
        let row = state.store.working().row(active_index)?;
        Ok(FarthestReport {
            original_id: state.store.active_to_original().get(active_index).copied(),
            profile: landmark_profile(row, &self.config.shape.landmarks),
            distance_to_reference: distance_to_reference(row, &state.reference_row)?,
        })
    }

    pub fn set_verdict(&mut self, cluster_id: ClusterId, value: bool) -> Result<(), SeriateError> {
        let state = self.state_mut()?;
        state.labels.set(cluster_id, value)?;
        debug!(cluster = cluster_id, verdict = value, "verdict recorded");
        Ok(())
    }

    pub fn verdict(&self, cluster_id: ClusterId) -> Result<Verdict, SeriateError> {
        Ok(self.state()?.labels.get(cluster_id))
    }

    /// The preprocessed rows the engine clustered, for visualization.
    pub fn working_series(&self) -> Result<Vec<Vec<f64>>, SeriateError> {
        Ok(self.state()?.store.working().to_rows())
    }

    pub fn verdict_report(&self) -> Result<VerdictReport, SeriateError> {
        let state = self.state()?;
        let original_len = state.store.original_len();

        let mut cluster_by_original = vec![None; original_len];
        for (&cluster_id, &original_id) in state
            .model
            .assignments()
            .iter()
            .zip(state.store.active_to_original().iter())
        {
            cluster_by_original[original_id] = Some(cluster_id);
        }

        Ok(VerdictReport {
            verdicts: state.labels.verdicts().to_vec(),
            cluster_by_original,
            verdict_by_original: state.labels.project_to_original(
                state.model.assignments(),
                state.store.active_to_original(),
                original_len,
            ),
            live_cluster_ids: state.model.cluster_ids(),
        })
    }

    fn state(&self) -> Result<&PipelineState, SeriateError> {
        self.state
            .as_ref()
            .ok_or_else(|| SeriateError::not_fitted("upload a dataset first"))
    }

    fn state_mut(&mut self) -> Result<&mut PipelineState, SeriateError> {
        self.state
            .as_mut()
            .ok_or_else(|| SeriateError::not_fitted("upload a dataset first"))
    }
}

/// Shareable session handle: one writer at a time, readers concurrent with
/// each other. Clone it freely across request handlers.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new(config: SessionConfig) -> Result<Self, SeriateError> {
        Ok(Self {
            inner: Arc::new(RwLock::new(Session::new(config)?)),
        })
    }

    pub fn upload(&self, rows: &[Vec<f64>]) -> Result<UploadSummary, SeriateError> {
        self.inner.write().upload(rows)
    }

    pub fn split(&self, cluster_id: ClusterId) -> Result<(), SeriateError> {
        self.inner.write().split(cluster_id)
    }

    pub fn set_verdict(&self, cluster_id: ClusterId, value: bool) -> Result<(), SeriateError> {
        self.inner.write().set_verdict(cluster_id, value)
    }

    pub fn cluster_count(&self) -> Result<usize, SeriateError> {
        self.inner.read().cluster_count()
    }

    pub fn closest(&self, cluster_id: ClusterId) -> Result<ClosestReport, SeriateError> {
        self.inner.read().closest(cluster_id)
    }

    pub fn farthest(&self, cluster_id: ClusterId) -> Result<FarthestReport, SeriateError> {
        self.inner.read().farthest(cluster_id)
    }

    pub fn verdict(&self, cluster_id: ClusterId) -> Result<Verdict, SeriateError> {
        self.inner.read().verdict(cluster_id)
    }

    pub fn working_series(&self) -> Result<Vec<Vec<f64>>, SeriateError> {
        self.inner.read().working_series()
    }

    pub fn verdict_report(&self) -> Result<VerdictReport, SeriateError> {
        self.inner.read().verdict_report()
    }
}
