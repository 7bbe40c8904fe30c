//! One-to-one matching of reference points against candidates.
//!
//! # Algorithms
//!
//! - [`MatchAlgorithm::GreedyNearest`]: most-constrained reference first, each
//!   takes its closest free candidate (fast, not globally optimal)
//! - [`MatchAlgorithm::OptimalAssignment`]: Hungarian solve minimizing total
//!   distance, then source single-use filtering
//! - [`MatchAlgorithm::MutualNearest`]: only pairs that are each other's
//!   nearest neighbor (most conservative)
//!
//! Every algorithm guarantees:
//! - matched distance ≤ radius
//! - each reference and each candidate used at most once
//! - each non-empty `source_ref` used at most once
//!
//! # Example
//!
//! ```
//! use pramana::algorithms::matching::{MatchAlgorithm, match_points};
//! use pramana::algorithms::spatial_index::{IndexBackend, SpatialIndex};
//! use pramana::core::{Detection, ReferencePoint};
//!
//! let references = vec![ReferencePoint::new("S-1", 0.0, 0.0)];
//! let candidates = vec![Detection::new(0.00045, 0.0).with_source("img-1.jpg")];
//! let ref_index = SpatialIndex::build(&references, IndexBackend::RTree);
//! let cand_index = SpatialIndex::build(&candidates, IndexBackend::RTree);
//!
//! let outcome = match_points(
//!     MatchAlgorithm::GreedyNearest,
//!     &references,
//!     &candidates,
//!     50.1,
//!     &ref_index,
//!     &cand_index,
//! );
//! assert_eq!(outcome.assignments.len(), 1);
//! assert!(outcome.unmatched_references.is_empty());
//! ```

mod greedy;
pub mod hungarian;
mod mutual;
mod optimal;

pub use greedy::match_greedy_nearest;
pub use mutual::match_mutual_nearest;
pub use optimal::match_optimal_assignment;

use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::spatial_index::SpatialIndex;
use crate::core::types::{Candidate, GeoPoint};
use crate::error::CoverageError;

/// Available matching algorithms.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum MatchAlgorithm {
    /// Greedy nearest, most-constrained reference first.
    #[default]
    #[value(name = "greedy_nearest")]
    GreedyNearest,

    /// Minimum total distance assignment (Hungarian method).
    #[value(name = "optimal_assignment", alias = "hungarian")]
    OptimalAssignment,

    /// Mutual nearest neighbors only.
    #[value(name = "mutual_nearest")]
    MutualNearest,
}

impl MatchAlgorithm {
    /// Canonical name used in config files, cache keys and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchAlgorithm::GreedyNearest => "greedy_nearest",
            MatchAlgorithm::OptimalAssignment => "optimal_assignment",
            MatchAlgorithm::MutualNearest => "mutual_nearest",
        }
    }

    /// Get a short description of this algorithm.
    pub fn description(&self) -> &'static str {
        match self {
            MatchAlgorithm::GreedyNearest => "Closest free candidate per reference (fast)",
            MatchAlgorithm::OptimalAssignment => "Minimum total distance (Hungarian method)",
            MatchAlgorithm::MutualNearest => "Only pairs that agree on each other (conservative)",
        }
    }

    /// Returns all available algorithms.
    pub fn all() -> &'static [MatchAlgorithm] {
        &[
            MatchAlgorithm::GreedyNearest,
            MatchAlgorithm::OptimalAssignment,
            MatchAlgorithm::MutualNearest,
        ]
    }
}

impl std::fmt::Display for MatchAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchAlgorithm {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy_nearest" => Ok(MatchAlgorithm::GreedyNearest),
            "optimal_assignment" | "hungarian" => Ok(MatchAlgorithm::OptimalAssignment),
            "mutual_nearest" => Ok(MatchAlgorithm::MutualNearest),
            other => Err(CoverageError::InvalidAlgorithm(other.to_string())),
        }
    }
}

impl TryFrom<String> for MatchAlgorithm {
    type Error = CoverageError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

/// One reference paired with one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchAssignment {
    /// Index into the reference slice.
    pub reference: usize,
    /// Index into the candidate slice.
    pub candidate: usize,
    /// Geodesic distance in meters.
    pub distance_m: f64,
}

impl MatchAssignment {
    /// Order by distance, then reference, then candidate.
    fn cmp_by_distance(&self, other: &MatchAssignment) -> std::cmp::Ordering {
        self.distance_m
            .total_cmp(&other.distance_m)
            .then(self.reference.cmp(&other.reference))
            .then(self.candidate.cmp(&other.candidate))
    }
}

/// Result of a matching run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Accepted pairs in acceptance order.
    pub assignments: Vec<MatchAssignment>,
    /// References with no assignment, ascending.
    pub unmatched_references: Vec<usize>,
    /// Candidates consumed by an assignment.
    pub used_candidates: BTreeSet<usize>,
}

impl MatchOutcome {
    pub fn matched_count(&self) -> usize {
        self.assignments.len()
    }
}

/// Run the selected algorithm.
///
/// `reference_index` and `candidate_index` must be built from `references`
/// and `candidates` respectively.
pub fn match_points<R: GeoPoint, C: Candidate>(
    algorithm: MatchAlgorithm,
    references: &[R],
    candidates: &[C],
    radius_meters: f64,
    reference_index: &SpatialIndex,
    candidate_index: &SpatialIndex,
) -> MatchOutcome {
    debug_assert_eq!(references.len(), reference_index.len());
    debug_assert_eq!(candidates.len(), candidate_index.len());

    let outcome = match algorithm {
        MatchAlgorithm::GreedyNearest => match_greedy_nearest(
            references,
            candidates,
            radius_meters,
            reference_index,
            candidate_index,
        ),
        MatchAlgorithm::OptimalAssignment => match_optimal_assignment(
            references,
            candidates,
            radius_meters,
            reference_index,
            candidate_index,
        ),
        MatchAlgorithm::MutualNearest => match_mutual_nearest(
            references,
            candidates,
            radius_meters,
            reference_index,
            candidate_index,
        ),
    };

    log::debug!(
        "{}: {} of {} references matched against {} candidates within {:.1}m",
        algorithm,
        outcome.matched_count(),
        references.len(),
        candidates.len(),
        radius_meters
    );

    outcome
}

/// Tracks which references, candidates and sources are already taken.
struct ClaimLedger<'a> {
    matched_references: Vec<bool>,
    used_candidates: Vec<bool>,
    used_sources: HashSet<&'a str>,
    assignments: Vec<MatchAssignment>,
}

impl<'a> ClaimLedger<'a> {
    fn new(reference_count: usize, candidate_count: usize) -> Self {
        Self {
            matched_references: vec![false; reference_count],
            used_candidates: vec![false; candidate_count],
            used_sources: HashSet::new(),
            assignments: Vec::new(),
        }
    }

    /// Whether a candidate and its source are both still free.
    fn is_available(&self, candidate: usize, source_ref: &str) -> bool {
        !self.used_candidates[candidate]
            && (source_ref.is_empty() || !self.used_sources.contains(source_ref))
    }

    /// Record `pair` if the reference, candidate and source are all free.
    fn try_claim(&mut self, pair: MatchAssignment, source_ref: &'a str) -> bool {
        if self.matched_references[pair.reference] || !self.is_available(pair.candidate, source_ref)
        {
            return false;
        }
        self.matched_references[pair.reference] = true;
        self.used_candidates[pair.candidate] = true;
        if !source_ref.is_empty() {
            self.used_sources.insert(source_ref);
        }
        self.assignments.push(pair);
        true
    }

    /// Accept `pairs` closest first, skipping any that conflict.
    fn claim_by_distance<C: Candidate>(&mut self, mut pairs: Vec<MatchAssignment>, candidates: &'a [C]) {
        pairs.sort_by(MatchAssignment::cmp_by_distance);
        for pair in pairs {
            self.try_claim(pair, candidates[pair.candidate].source_ref());
        }
    }

    fn finish(self) -> MatchOutcome {
        let unmatched_references = self
            .matched_references
            .iter()
            .enumerate()
            .filter(|(_, matched)| !**matched)
            .map(|(i, _)| i)
            .collect();
        let used_candidates = self
            .used_candidates
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(i, _)| i)
            .collect();
        MatchOutcome {
            assignments: self.assignments,
            unmatched_references,
            used_candidates,
        }
    }
}
