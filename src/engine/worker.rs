//! Background analysis thread.
//!
//! Clustering and optimal assignment are CPU-bound, so request-serving
//! callers hand the work to an [`AnalysisJob`]: a named thread that streams
//! [`ProgressEvent`]s over a channel and checks a cancel flag at each phase
//! boundary.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::analyzer::{Analysis, AnalysisParams, CoverageAnalyzer};
use super::progress::{AnalysisPhase, ProgressEvent, ProgressSink};
use crate::core::types::{Detection, ReferencePoint};
use crate::error::{CoverageError, Result};

/// Forwards phases to the channel and honors the cancel flag.
struct ChannelSink {
    events: Sender<ProgressEvent>,
    cancel: Arc<AtomicBool>,
}

impl ProgressSink for ChannelSink {
    fn phase_started(&mut self, phase: AnalysisPhase) -> ControlFlow<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return ControlFlow::Break(());
        }
        // Nobody listening is fine
        let _ = self.events.send(ProgressEvent::from(phase));
        ControlFlow::Continue(())
    }
}

/// Handle to a running analysis.
pub struct AnalysisJob {
    handle: JoinHandle<Result<Analysis>>,
    events: Receiver<ProgressEvent>,
    cancel: Arc<AtomicBool>,
}

impl AnalysisJob {
    /// Spawn an analysis on its own thread.
    pub fn spawn(
        analyzer: Arc<CoverageAnalyzer>,
        references: Vec<ReferencePoint>,
        detections: Vec<Detection>,
        params: AnalysisParams,
    ) -> Result<Self> {
        Self::spawn_with_cancel(
            analyzer,
            references,
            detections,
            params,
            Arc::new(AtomicBool::new(false)),
        )
    }

    /// Spawn with a caller-owned cancel flag.
    pub fn spawn_with_cancel(
        analyzer: Arc<CoverageAnalyzer>,
        references: Vec<ReferencePoint>,
        detections: Vec<Detection>,
        params: AnalysisParams,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self> {
        let (tx, rx) = unbounded();
        let mut sink = ChannelSink {
            events: tx.clone(),
            cancel: Arc::clone(&cancel),
        };

        let handle = thread::Builder::new()
            .name("coverage-analysis".into())
            .spawn(move || {
                log::debug!(
                    "Analysis thread started ({} references, {} detections)",
                    references.len(),
                    detections.len()
                );
                let result =
                    analyzer.analyze_with_progress(&references, &detections, &params, &mut sink);
                if result.is_ok() {
                    let _ = tx.send(ProgressEvent {
                        phase: AnalysisPhase::Rendering,
                        percent: 100,
                    });
                }
                result
            })?;

        Ok(Self {
            handle,
            events: rx,
            cancel,
        })
    }

    /// Progress events in phase order. Disconnects when the job ends.
    pub fn progress(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Ask the job to stop at the next phase boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the analysis to finish.
    pub fn join(self) -> Result<Analysis> {
        match self.handle.join() {
            Ok(result) => result,
            Err(e) => {
                log::error!("Analysis thread panicked: {:?}", e);
                Err(CoverageError::WorkerPanicked)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::spatial_index::IndexBackend;

    fn inputs() -> (Vec<ReferencePoint>, Vec<Detection>) {
        (
            vec![ReferencePoint::new("a", 0.0, 0.0)],
            vec![Detection::new(0.000449, 0.0).with_source("x.jpg")],
        )
    }

    #[test]
    fn test_job_streams_phases_then_completes() {
        let (references, detections) = inputs();
        let analyzer = Arc::new(CoverageAnalyzer::uncached(IndexBackend::RTree));
        let job =
            AnalysisJob::spawn(analyzer, references, detections, AnalysisParams::default()).unwrap();

        let events: Vec<ProgressEvent> = job.progress().iter().collect();
        let analysis = job.join().unwrap();

        assert_eq!(analysis.report.stats.matched, 1);
        let phases: Vec<AnalysisPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(&phases[..6], &AnalysisPhase::ALL[..]);
        assert_eq!(events.last().map(|e| e.percent), Some(100));
        assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
    }

    #[test]
    fn test_pre_cancelled_job_stops_at_first_phase() {
        let (references, detections) = inputs();
        let analyzer = Arc::new(CoverageAnalyzer::uncached(IndexBackend::RTree));
        let cancel = Arc::new(AtomicBool::new(true));
        let job = AnalysisJob::spawn_with_cancel(
            analyzer,
            references,
            detections,
            AnalysisParams::default(),
            cancel,
        )
        .unwrap();

        let err = job.join().unwrap_err();
        assert!(matches!(
            err,
            CoverageError::Cancelled {
                phase: AnalysisPhase::LoadingReferences
            }
        ));
    }

    #[test]
    fn test_invalid_params_surface_from_worker() {
        let (references, detections) = inputs();
        let analyzer = Arc::new(CoverageAnalyzer::uncached(IndexBackend::RTree));
        let params = AnalysisParams {
            radius_meters: -1.0,
            ..Default::default()
        };
        let job = AnalysisJob::spawn(analyzer, references, detections, params).unwrap();
        assert!(matches!(
            job.join(),
            Err(CoverageError::InvalidRadius { .. })
        ));
    }
}
