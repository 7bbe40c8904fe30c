//! Phase markers for long-running analyses.
//!
//! The analysis reports each phase before it starts. A [`ProgressSink`] may
//! stop the run at any of these boundaries; nothing is interrupted mid-phase.

use std::ops::ControlFlow;

use serde::Serialize;

/// Stages of one analysis call, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    LoadingReferences,
    LoadingCandidates,
    Clustering,
    Indexing,
    Matching,
    Rendering,
}

impl AnalysisPhase {
    /// All phases in execution order.
    pub const ALL: [AnalysisPhase; 6] = [
        AnalysisPhase::LoadingReferences,
        AnalysisPhase::LoadingCandidates,
        AnalysisPhase::Clustering,
        AnalysisPhase::Indexing,
        AnalysisPhase::Matching,
        AnalysisPhase::Rendering,
    ];

    /// Approximate completion when this phase starts.
    pub fn percent(&self) -> u8 {
        match self {
            AnalysisPhase::LoadingReferences => 0,
            AnalysisPhase::LoadingCandidates => 10,
            AnalysisPhase::Clustering => 20,
            AnalysisPhase::Indexing => 40,
            AnalysisPhase::Matching => 50,
            AnalysisPhase::Rendering => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::LoadingReferences => "loading_references",
            AnalysisPhase::LoadingCandidates => "loading_candidates",
            AnalysisPhase::Clustering => "clustering",
            AnalysisPhase::Indexing => "indexing",
            AnalysisPhase::Matching => "matching",
            AnalysisPhase::Rendering => "rendering",
        }
    }
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress update emitted by a background analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: AnalysisPhase,
    pub percent: u8,
}

impl From<AnalysisPhase> for ProgressEvent {
    fn from(phase: AnalysisPhase) -> Self {
        Self {
            phase,
            percent: phase.percent(),
        }
    }
}

/// Receiver of phase markers.
///
/// Returning [`ControlFlow::Break`] cancels the analysis before `phase` runs.
pub trait ProgressSink {
    fn phase_started(&mut self, phase: AnalysisPhase) -> ControlFlow<()>;
}

/// Ignores progress and never cancels.
impl ProgressSink for () {
    fn phase_started(&mut self, _phase: AnalysisPhase) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Records every phase; handy for tests and synchronous callers.
impl ProgressSink for Vec<AnalysisPhase> {
    fn phase_started(&mut self, phase: AnalysisPhase) -> ControlFlow<()> {
        self.push(phase);
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_is_monotonic() {
        let percents: Vec<u8> = AnalysisPhase::ALL.iter().map(|p| p.percent()).collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert!(percents.iter().all(|&p| p < 100));
    }

    #[test]
    fn test_display_matches_serde() {
        for phase in AnalysisPhase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{phase}\""));
        }
    }

    #[test]
    fn test_event_from_phase() {
        let event = ProgressEvent::from(AnalysisPhase::Matching);
        assert_eq!(event.percent, 50);
        assert_eq!(event.phase, AnalysisPhase::Matching);
    }
}
