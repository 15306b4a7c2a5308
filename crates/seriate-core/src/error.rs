// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Error taxonomy for the seriate engine.
///
/// Every variant is a deterministic, recoverable input/state error; none of
/// them warrants a retry inside the engine. The routing layer is responsible
/// for mapping variants to transport-level responses.
#[derive(Debug, thiserror::Error)]
pub enum SeriateError {
    /// Malformed or ragged input data.
    #[error("shape error: {0}")]
    Shape(String),

    /// A column had zero standard deviation during standardization.
    #[error("degenerate column: {0}")]
    DegenerateColumn(String),

    /// Too few rows survived for the requested estimate.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid k, or an invalid/too-small target cluster for a split.
    #[error("cluster error: {0}")]
    Cluster(String),

    /// A query against a cluster with zero current members.
    #[error("empty cluster: {0}")]
    EmptyCluster(String),

    /// Unknown cluster id in a query or verdict call.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation that requires a fitted session was called before upload.
    #[error("not fitted: {0}")]
    NotFitted(String),
}

impl SeriateError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }

    pub fn degenerate_column(message: impl Into<String>) -> Self {
        Self::DegenerateColumn(message.into())
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }

    pub fn cluster(message: impl Into<String>) -> Self {
        Self::Cluster(message.into())
    }

    pub fn empty_cluster(message: impl Into<String>) -> Self {
        Self::EmptyCluster(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn not_fitted(message: impl Into<String>) -> Self {
        Self::NotFitted(message.into())
    }
}
