//! Pramana - Geospatial coverage matching
//!
//! Compares an authoritative registry of geo-located markers ("references")
//! against sensor-derived detections and reports which references were seen,
//! which were missed, and which detections match no known reference.
//!
//! # Architecture
//!
//! The crate is organized into 4 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │              (records, geojson)                     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │     (analyzer, report, cache, progress, worker)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │      (spatial_index, clustering, matching)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, geodesy)                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! 1. Detections within the cluster radius are merged into clusters
//! 2. References and clusters are indexed on the unit sphere
//! 3. The selected matcher pairs references with clusters one-to-one
//! 4. Leftovers are classified as undetected, new findings or unclaimed
//!
//! # Example
//!
//! ```
//! use pramana::{AnalysisParams, CoverageAnalyzer, Detection, MatchAlgorithm, ReferencePoint};
//!
//! let references = vec![ReferencePoint::new("S-1", 0.0, 0.0)];
//! let detections = vec![Detection::new(0.00045, 0.0).with_source("img-1.jpg")];
//!
//! let analyzer = CoverageAnalyzer::default();
//! let params = AnalysisParams::new(50.1, 30.0, MatchAlgorithm::GreedyNearest);
//! let analysis = analyzer.analyze(&references, &detections, &params).unwrap();
//!
//! assert_eq!(analysis.report.stats.matched, 1);
//! assert!(!analysis.from_cache);
//! ```

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Algorithms (depends on core)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 3: Engine (depends on core, algorithms)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 4: I/O infrastructure (depends on all layers)
// ============================================================================
pub mod io;

// Cross-cutting
pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::geodesy::{EARTH_RADIUS_METERS, distance, haversine_distance};
pub use crate::core::types::{BoundingBox, Candidate, Cluster, Detection, GeoPoint, ReferencePoint};

// Algorithms
pub use algorithms::clustering::{cluster_detections, singleton_clusters};
pub use algorithms::matching::{MatchAlgorithm, MatchAssignment, MatchOutcome, match_points};
pub use algorithms::spatial_index::{IndexBackend, SpatialIndex};

// Engine
pub use engine::{
    Analysis, AnalysisJob, AnalysisParams, AnalysisPhase, CoverageAnalyzer, CoverageReport,
    CoverageStats, ProgressEvent, ProgressSink, ReferenceSummary, run_analysis,
};

// Configuration and errors
pub use config::Config;
pub use error::{CoverageError, Result};
