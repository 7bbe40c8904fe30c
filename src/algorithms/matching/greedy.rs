//! Greedy nearest matching.
//!
//! References are visited in ascending order of how many candidates lie within
//! the radius, so references with few options are served before they can be
//! starved by better-connected neighbors. Each takes its closest candidate
//! whose capture has not been used yet.

use super::{ClaimLedger, MatchAssignment, MatchOutcome};
use crate::algorithms::spatial_index::SpatialIndex;
use crate::core::types::{Candidate, GeoPoint};

/// Greedy nearest matching. Deterministic, sub-quadratic with the R-tree.
pub fn match_greedy_nearest<R: GeoPoint, C: Candidate>(
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

    // Neighbor lists come back sorted by (distance, index)
    let options = reference_index.neighbors_within(candidate_index, radius_meters);

    let mut order: Vec<usize> = (0..references.len()).collect();
    order.sort_by_key(|&r| (options[r].len(), r));

    for r in order {
        let best = options[r]
            .iter()
            .find(|n| ledger.is_available(n.index, candidates[n.index].source_ref()));

        if let Some(n) = best {
            ledger.try_claim(
                MatchAssignment {
                    reference: r,
                    candidate: n.index,
                    distance_m: n.distance_m,
                },
                candidates[n.index].source_ref(),
            );
        }
    }

    ledger.finish()
}
