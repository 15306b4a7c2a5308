// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! The stateful analysis session: upload pipeline (preprocess, shape filter,
//! outlier filter, fit), interactive cluster splitting, verdict bookkeeping,
//! and the shareable [`SessionHandle`] a routing layer talks to.

pub mod labels;
pub mod session;
pub mod store;

pub use labels::LabelStore;
pub use session::{
    ClosestReport, FarthestReport, Session, SessionConfig, SessionHandle, UploadSummary,
    VerdictReport,
};
pub use store::SeriesStore;
