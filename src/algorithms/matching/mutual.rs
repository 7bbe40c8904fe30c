//! Mutual nearest neighbor matching.
//!
//! A pair qualifies only when the candidate is the reference's nearest
//! candidate, the reference is the candidate's nearest reference, and the two
//! are within the radius. Qualifying pairs are accepted closest first under
//! the usual source single-use rule.

use super::{ClaimLedger, MatchAssignment, MatchOutcome};
use crate::algorithms::spatial_index::SpatialIndex;
use crate::core::types::{Candidate, GeoPoint};

/// Mutual nearest matching. Never matches more than greedy nearest.
pub fn match_mutual_nearest<R: GeoPoint, C: Candidate>(
    references: &[R],
    candidates: &[C],
    radius_meters: f64,
    reference_index: &SpatialIndex,
    candidate_index: &SpatialIndex,
) -> MatchOutcome {
    let mut ledger = ClaimLedger::new(references.len(), candidates.len());
    if references.is_empty() || candidates.is_empty() {
        return ledger.finish();
    }

    let nearest_candidate = reference_index.nearest_in(candidate_index);
    let nearest_reference = candidate_index.nearest_in(reference_index);

    let pairs: Vec<MatchAssignment> = nearest_candidate
        .iter()
        .enumerate()
        .filter_map(|(r, nearest)| {
            let n = (*nearest)?;
            let back = nearest_reference[n.index]?;
            (back.index == r && n.distance_m <= radius_meters).then_some(MatchAssignment {
                reference: r,
                candidate: n.index,
                distance_m: n.distance_m,
            })
        })
        .collect();

    log::debug!("mutual_nearest: {} mutual pairs within radius", pairs.len());

    ledger.claim_by_distance(pairs, candidates);
    ledger.finish()
}
