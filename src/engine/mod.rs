//! Coverage orchestration layer.
//!
//! This layer chains the algorithms into one analysis call.
//!
//! # Contents
//!
//! - [`analyzer`]: Pipeline entry point and cache-aware front end
//! - [`report`]: Matched / undetected / new-finding classification and stats
//! - [`cache`]: TTL-bounded result cache
//! - [`progress`]: Phase markers and cancellation
//! - [`worker`]: Background analysis thread

pub mod analyzer;
pub mod cache;
pub mod progress;
pub mod report;
pub mod worker;

pub use analyzer::{Analysis, AnalysisParams, CoverageAnalyzer, run_analysis};
pub use cache::{CacheKey, ResultCache};
pub use progress::{AnalysisPhase, ProgressEvent, ProgressSink};
pub use report::{
    CategoryCoverage, CoverageReport, CoverageStats, CoverageSummary, MatchedReference,
    ReferenceSummary, UnmatchedCandidate,
};
pub use worker::AnalysisJob;
