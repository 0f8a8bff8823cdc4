#![allow(
    clippy::missing_errors_doc,
    reason = "fallible APIs share the one `ScoutError` contract"
)]

pub mod compress;
pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod pipeline;
pub mod sanitize;
pub mod select;
pub mod similarity;

pub use error::{Result, ScoutError};
pub use models::{EvidenceReport, RepoRecord, SearchHit};
pub use pipeline::EvidencePipeline;
pub use sanitize::TARGET_MARKER;
