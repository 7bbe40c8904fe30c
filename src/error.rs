//! Error types for coverage analysis.

use thiserror::Error;

use crate::engine::progress::AnalysisPhase;

/// Coverage analysis error type.
#[derive(Error, Debug)]
pub enum CoverageError {
    /// Algorithm name is not one of the supported matchers.
    #[error("Unknown algorithm: {0}. Must be one of greedy_nearest, optimal_assignment, mutual_nearest")]
    InvalidAlgorithm(String),

    /// Radius parameter out of range.
    #[error("Invalid {parameter}: {value}")]
    InvalidRadius {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// The caller stopped the analysis at a phase boundary.
    #[error("Analysis cancelled before {phase}")]
    Cancelled {
        /// Phase that was about to start.
        phase: AnalysisPhase,
    },

    /// Input record rejected before reaching the engine.
    #[error("Invalid record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background analysis thread panicked.
    #[error("Analysis worker panicked")]
    WorkerPanicked,
}

impl From<basic_toml::Error> for CoverageError {
    fn from(e: basic_toml::Error) -> Self {
        CoverageError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoverageError>;
