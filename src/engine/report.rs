//! Classification of match outcomes into a coverage report.
//!
//! Every reference ends up either matched or undetected. Every candidate not
//! consumed by a match is split by distance to its nearest reference:
//!
//! - **new finding**: farther than the match radius from every reference
//! - **unclaimed**: within radius of some reference but lost the conflict
//!
//! Both carry `nearest_reference_distance_m` so the two can be told apart
//! downstream.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::algorithms::matching::{MatchAlgorithm, MatchOutcome};
use crate::algorithms::spatial_index::SpatialIndex;
use crate::core::types::{Cluster, ReferencePoint};

/// Category key used for references without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// A reference corroborated by a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedReference {
    pub reference: ReferencePoint,
    pub candidate: Cluster,
    pub distance_m: f64,
}

/// A candidate that did not take part in any match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedCandidate {
    pub candidate: Cluster,
    /// Distance to the closest reference, `None` when there are no references.
    pub nearest_reference_distance_m: Option<f64>,
}

/// Coverage for one reference category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryCoverage {
    pub total: usize,
    pub matched: usize,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub coverage_percent: f64,
}

/// Human-readable headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    /// `"matched/total (p%)"`
    pub coverage: String,
    /// `"n points not in reference registry"`
    pub potential_new: String,
}

/// Counts and timing for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total_references: usize,
    /// Raw detections before clustering.
    pub total_detections: usize,
    /// Candidates after clustering.
    pub total_candidates: usize,
    pub matched: usize,
    pub undetected: usize,
    pub new_findings: usize,
    pub unclaimed: usize,
    /// `matched / total_references * 100`, 0 when there are no references.
    #[serde(serialize_with = "serialize_one_decimal")]
    pub coverage_percent: f64,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub processing_time_ms: f64,
    pub algorithm: MatchAlgorithm,
    pub by_category: BTreeMap<String, CategoryCoverage>,
}

impl CoverageStats {
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary {
            coverage: format!(
                "{}/{} ({:.1}%)",
                self.matched, self.total_references, self.coverage_percent
            ),
            potential_new: format!(
                "{} points not in reference registry",
                self.new_findings
            ),
        }
    }
}

/// Full result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Matched references, in reference order.
    pub matched: Vec<MatchedReference>,
    /// Unmatched references, in reference order.
    pub undetected: Vec<ReferencePoint>,
    /// Candidates far from every reference, in candidate order.
    pub new_findings: Vec<UnmatchedCandidate>,
    /// Candidates near a reference that were not matched, in candidate order.
    pub unclaimed: Vec<UnmatchedCandidate>,
    pub stats: CoverageStats,
}

/// Inputs to [`aggregate`] besides the outcome itself.
#[derive(Debug, Clone, Copy)]
pub struct AggregateContext<'a> {
    pub references: &'a [ReferencePoint],
    pub candidates: &'a [Cluster],
    pub reference_index: &'a SpatialIndex,
    pub candidate_index: &'a SpatialIndex,
    pub radius_meters: f64,
    pub algorithm: MatchAlgorithm,
    /// Detection count before clustering.
    pub total_detections: usize,
}

/// Build a report from a matching outcome.
///
/// `stats.processing_time_ms` is left at 0 for the caller to fill in.
pub fn aggregate(ctx: &AggregateContext<'_>, outcome: &MatchOutcome) -> CoverageReport {
    let references = ctx.references;
    let candidates = ctx.candidates;

    let mut assignments = outcome.assignments.clone();
    assignments.sort_by_key(|a| a.reference);

    let matched: Vec<MatchedReference> = assignments
        .iter()
        .map(|a| MatchedReference {
            reference: references[a.reference].clone(),
            candidate: candidates[a.candidate].clone(),
            distance_m: a.distance_m,
        })
        .collect();

    let undetected: Vec<ReferencePoint> = outcome
        .unmatched_references
        .iter()
        .map(|&r| references[r].clone())
        .collect();

    let mut new_findings = Vec::new();
    let mut unclaimed = Vec::new();
    if candidates.len() > outcome.used_candidates.len() {
        let nearest = ctx.candidate_index.nearest_in(ctx.reference_index);
        for (c, candidate) in candidates.iter().enumerate() {
            if outcome.used_candidates.contains(&c) {
                continue;
            }
            let nearest_distance = nearest[c].map(|n| n.distance_m);
            let entry = UnmatchedCandidate {
                candidate: candidate.clone(),
                nearest_reference_distance_m: nearest_distance,
            };
            match nearest_distance {
                Some(d) if d <= ctx.radius_meters => unclaimed.push(entry),
                _ => new_findings.push(entry),
            }
        }
    }

    let stats = CoverageStats {
        total_references: references.len(),
        total_detections: ctx.total_detections,
        total_candidates: candidates.len(),
        matched: matched.len(),
        undetected: undetected.len(),
        new_findings: new_findings.len(),
        unclaimed: unclaimed.len(),
        coverage_percent: percent(matched.len(), references.len()),
        processing_time_ms: 0.0,
        algorithm: ctx.algorithm,
        by_category: category_coverage(references, &assignments),
    };

    CoverageReport {
        matched,
        undetected,
        new_findings,
        unclaimed,
        stats,
    }
}

fn category_coverage(
    references: &[ReferencePoint],
    assignments: &[crate::algorithms::matching::MatchAssignment],
) -> BTreeMap<String, CategoryCoverage> {
    let mut by_category: BTreeMap<String, CategoryCoverage> = BTreeMap::new();
    for reference in references {
        by_category
            .entry(category_key(reference).to_string())
            .or_default()
            .total += 1;
    }
    for a in assignments {
        if let Some(entry) = by_category.get_mut(category_key(&references[a.reference])) {
            entry.matched += 1;
        }
    }
    for entry in by_category.values_mut() {
        entry.coverage_percent = percent(entry.matched, entry.total);
    }
    by_category
}

fn category_key(reference: &ReferencePoint) -> &str {
    if reference.category.is_empty() {
        UNCATEGORIZED
    } else {
        &reference.category
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn serialize_one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_one_decimal(*value))
}

/// Counts over the reference registry alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    /// Keyed by the numeric attribute value; references without one are
    /// not counted here.
    pub by_numeric_attribute: BTreeMap<i64, usize>,
}

impl ReferenceSummary {
    pub fn from_points(references: &[ReferencePoint]) -> Self {
        let mut summary = ReferenceSummary {
            total: references.len(),
            ..Default::default()
        };
        for reference in references {
            *summary
                .by_category
                .entry(category_key(reference).to_string())
                .or_default() += 1;
            if let Some(value) = reference.numeric_attribute {
                *summary.by_numeric_attribute.entry(value).or_default() += 1;
            }
        }
        summary
    }
}
