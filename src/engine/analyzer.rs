//! Coverage analysis entry point.
//!
//! Pipeline per call:
//!
//! ```text
//! detections ─► cluster ─► index ─┐
//!                                 ├─► match ─► aggregate ─► CoverageReport
//! references ───────────► index ──┘
//! ```
//!
//! [`run_analysis`] is the pure pipeline. [`CoverageAnalyzer`] wraps it with
//! the result cache: the lock is taken for the lookup and again for the
//! insert, never across the computation.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::cache::{CacheKey, ResultCache};
use super::progress::{AnalysisPhase, ProgressSink};
use super::report::{AggregateContext, CoverageReport, aggregate};
use crate::algorithms::clustering::{cluster_detections, singleton_clusters};
use crate::algorithms::matching::{MatchAlgorithm, match_points};
use crate::algorithms::spatial_index::{IndexBackend, SpatialIndex};
use crate::config::Config;
use crate::core::types::{Detection, ReferencePoint};
use crate::error::{CoverageError, Result};

/// Per-call analysis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Maximum reference-to-candidate distance for a match. Must be > 0.
    pub radius_meters: f64,
    /// Detection deduplication radius. 0 disables clustering.
    pub cluster_radius_meters: f64,
    pub algorithm: MatchAlgorithm,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            radius_meters: 50.0,
            cluster_radius_meters: 30.0,
            algorithm: MatchAlgorithm::GreedyNearest,
        }
    }
}

impl AnalysisParams {
    pub fn new(radius_meters: f64, cluster_radius_meters: f64, algorithm: MatchAlgorithm) -> Self {
        Self {
            radius_meters,
            cluster_radius_meters,
            algorithm,
        }
    }

    /// Reject non-finite or out-of-range radii.
    pub fn validate(&self) -> Result<()> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(CoverageError::InvalidRadius {
                parameter: "radius_meters",
                value: self.radius_meters,
            });
        }
        if !self.cluster_radius_meters.is_finite() || self.cluster_radius_meters < 0.0 {
            return Err(CoverageError::InvalidRadius {
                parameter: "cluster_radius_meters",
                value: self.cluster_radius_meters,
            });
        }
        Ok(())
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(
            self.radius_meters,
            self.cluster_radius_meters,
            self.algorithm,
        )
    }
}

/// Result of [`CoverageAnalyzer::analyze`].
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Arc<CoverageReport>,
    /// True when the report came from the result cache.
    pub from_cache: bool,
}

/// Run the full pipeline once, without caching.
///
/// `progress` is told about each phase before it starts and may cancel there.
pub fn run_analysis(
    references: &[ReferencePoint],
    detections: &[Detection],
    params: &AnalysisParams,
    backend: IndexBackend,
    progress: &mut dyn ProgressSink,
) -> Result<CoverageReport> {
    params.validate()?;
    let start = Instant::now();

    checkpoint(progress, AnalysisPhase::LoadingReferences)?;
    log::debug!("{} reference points", references.len());

    checkpoint(progress, AnalysisPhase::LoadingCandidates)?;
    log::debug!("{} detections", detections.len());

    checkpoint(progress, AnalysisPhase::Clustering)?;
    let candidates = if params.cluster_radius_meters > 0.0 {
        cluster_detections(detections, params.cluster_radius_meters, backend)
    } else {
        singleton_clusters(detections)
    };

    checkpoint(progress, AnalysisPhase::Indexing)?;
    let reference_index = SpatialIndex::build(references, backend);
    let candidate_index = SpatialIndex::build(&candidates, backend);

    checkpoint(progress, AnalysisPhase::Matching)?;
    let outcome = match_points(
        params.algorithm,
        references,
        &candidates,
        params.radius_meters,
        &reference_index,
        &candidate_index,
    );

    checkpoint(progress, AnalysisPhase::Rendering)?;
    let ctx = AggregateContext {
        references,
        candidates: &candidates,
        reference_index: &reference_index,
        candidate_index: &candidate_index,
        radius_meters: params.radius_meters,
        algorithm: params.algorithm,
        total_detections: detections.len(),
    };
    let mut report = aggregate(&ctx, &outcome);
    report.stats.processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let summary = report.stats.summary();
    log::info!(
        "Coverage ({}, r={:.1}m, cluster={:.1}m): {}, {} unclaimed, {} in {:.1}ms",
        params.algorithm,
        params.radius_meters,
        params.cluster_radius_meters,
        summary.coverage,
        report.stats.unclaimed,
        summary.potential_new,
        report.stats.processing_time_ms
    );

    Ok(report)
}

fn checkpoint(progress: &mut dyn ProgressSink, phase: AnalysisPhase) -> Result<()> {
    match progress.phase_started(phase) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => {
            log::info!("Analysis cancelled before {}", phase);
            Err(CoverageError::Cancelled { phase })
        }
    }
}

/// Analysis front end holding the index backend and the result cache.
///
/// Cached reports are keyed by parameters only; call
/// [`invalidate_cache`](Self::invalidate_cache) whenever the input data
/// changes.
#[derive(Debug)]
pub struct CoverageAnalyzer {
    backend: IndexBackend,
    cache: Option<ResultCache>,
}

impl Default for CoverageAnalyzer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl CoverageAnalyzer {
    pub fn new(config: &Config) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| ResultCache::new(config.cache.ttl(), config.cache.max_entries));
        Self {
            backend: config.index.backend,
            cache,
        }
    }

    /// Analyzer without a result cache.
    pub fn uncached(backend: IndexBackend) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn backend(&self) -> IndexBackend {
        self.backend
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn analyze(
        &self,
        references: &[ReferencePoint],
        detections: &[Detection],
        params: &AnalysisParams,
    ) -> Result<Analysis> {
        self.analyze_with_progress(references, detections, params, &mut ())
    }

    /// Like [`analyze`](Self::analyze), reporting phases to `progress`.
    ///
    /// A cache hit returns immediately without reporting any phase.
    pub fn analyze_with_progress(
        &self,
        references: &[ReferencePoint],
        detections: &[Detection],
        params: &AnalysisParams,
        progress: &mut dyn ProgressSink,
    ) -> Result<Analysis> {
        params.validate()?;
        let key = params.cache_key();

        if let Some(report) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            log::debug!("Result cache hit for {:?}", key);
            return Ok(Analysis {
                report,
                from_cache: true,
            });
        }

        let report = Arc::new(run_analysis(
            references,
            detections,
            params,
            self.backend,
            progress,
        )?);

        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::clone(&report));
        }

        Ok(Analysis {
            report,
            from_cache: false,
        })
    }

    /// Forget every cached report.
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
