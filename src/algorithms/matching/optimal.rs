//! Optimal assignment matching.
//!
//! Cells of the reference × candidate cost matrix hold the geodesic distance
//! when it is within the radius and [`OUT_OF_RANGE_COST`] otherwise, so the
//! solver first maximizes the number of in-range pairs and then minimizes
//! their total distance.
//!
//! The within-radius graph is split into connected components and each one is
//! solved on its own; pairs from different components never share a row or
//! column, so the union of per-component optima is optimal for the full
//! matrix.
//!
//! The solver knows nothing about shared captures. Its pairs are accepted
//! closest first and any pair whose `source_ref` is already used is dropped,
//! which can leave the final set short of the true constrained optimum.

use std::collections::HashMap;

use super::hungarian::{CostMatrix, solve};
use super::{ClaimLedger, MatchAssignment, MatchOutcome};
use crate::algorithms::clustering::UnionFind;
use crate::algorithms::spatial_index::{Neighbor, SpatialIndex};
use crate::core::types::{Candidate, GeoPoint};

/// Cost of a pairing beyond the match radius.
pub const OUT_OF_RANGE_COST: f64 = 1e9;

/// One connected component of the within-radius graph.
#[derive(Debug, Default)]
struct Component {
    references: Vec<usize>,
    candidates: Vec<usize>,
}

/// Minimum total distance matching with post-hoc source filtering.
pub fn match_optimal_assignment<R: GeoPoint, C: Candidate>(
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

    let options = reference_index.neighbors_within(candidate_index, radius_meters);
    let components = connected_components(&options, references.len(), candidates.len());

    let mut pairs = Vec::new();
    for component in &components {
        pairs.extend(solve_component(component, &options));
    }

    log::debug!(
        "optimal_assignment: {} components, {} solver pairs before source filtering",
        components.len(),
        pairs.len()
    );

    ledger.claim_by_distance(pairs, candidates);
    ledger.finish()
}

/// Group references and candidates joined by any in-range edge.
///
/// Components are ordered by their smallest reference index; members are
/// ascending. Isolated nodes are left out.
fn connected_components(
    options: &[Vec<Neighbor>],
    reference_count: usize,
    candidate_count: usize,
) -> Vec<Component> {
    // Nodes 0..n are references, n..n+m are candidates
    let mut sets = UnionFind::new(reference_count + candidate_count);
    let mut candidate_linked = vec![false; candidate_count];
    for (r, neighbors) in options.iter().enumerate() {
        for n in neighbors {
            sets.union(r, reference_count + n.index);
            candidate_linked[n.index] = true;
        }
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Component> = Vec::new();

    for (r, neighbors) in options.iter().enumerate() {
        if neighbors.is_empty() {
            continue;
        }
        let root = sets.find(r);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            components.push(Component::default());
            components.len() - 1
        });
        components[slot].references.push(r);
    }

    for (c, linked) in candidate_linked.iter().enumerate() {
        if !linked {
            continue;
        }
        let root = sets.find(reference_count + c);
        if let Some(&slot) = slot_of_root.get(&root) {
            components[slot].candidates.push(c);
        }
    }

    components
}

/// Solve one component and return its in-range pairs.
fn solve_component(
    component: &Component,
    options: &[Vec<Neighbor>],
) -> Vec<MatchAssignment> {
    let column_of: HashMap<usize, usize> = component
        .candidates
        .iter()
        .enumerate()
        .map(|(col, &c)| (c, col))
        .collect();

    let mut costs = CostMatrix::new(
        component.references.len(),
        component.candidates.len(),
        OUT_OF_RANGE_COST,
    );
    for (row, &r) in component.references.iter().enumerate() {
        for n in &options[r] {
            if let Some(&col) = column_of.get(&n.index) {
                costs.set(row, col, n.distance_m);
            }
        }
    }

    solve(&costs)
        .into_iter()
        .enumerate()
        .filter_map(|(row, col)| {
            let col = col?;
            let distance_m = costs.get(row, col);
            (distance_m < OUT_OF_RANGE_COST).then(|| MatchAssignment {
                reference: component.references[row],
                candidate: component.candidates[col],
                distance_m,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::MatchAlgorithm;
    use super::super::hungarian::assignment_cost;
    use super::super::test_utils::*;
    use super::*;
    use crate::algorithms::spatial_index::IndexBackend;
    use crate::core::geodesy::distance;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const OPTIMAL: MatchAlgorithm = MatchAlgorithm::OptimalAssignment;

    #[test]
    fn test_total_distance_not_above_greedy() {
        let refs = vec![reference("a", 0.0, 0.0), reference("b", 0.0, 0.0003)];
        let cands = vec![
            candidate(0.0, 0.00016, "1"),
            candidate(0.0, 0.00046, "2"),
        ];
        let radius = 40.0;

        let optimal = run(OPTIMAL, &refs, &cands, radius);
        let greedy = run(MatchAlgorithm::GreedyNearest, &refs, &cands, radius);
        assert_valid(&optimal, &refs, &cands, radius);

        let total = |o: &MatchOutcome| o.assignments.iter().map(|a| a.distance_m).sum::<f64>();
        assert_eq!(optimal.matched_count(), 2);
        assert!(total(&optimal) <= total(&greedy) + 1e-9);
    }

    #[test]
    fn test_maximizes_matched_count() {
        // "a" is closest to candidate 0 but "b" can only use candidate 0
        let refs = vec![reference("a", 0.0, 0.0), reference("b", 0.0, 0.0004)];
        let cands = vec![
            candidate(0.0, 0.0001, "1"),
            candidate(0.0, -0.0002, "2"),
        ];
        let outcome = run(OPTIMAL, &refs, &cands, 35.0);
        assert_eq!(outcome.matched_count(), 2);
    }

    #[test]
    fn test_source_filter_runs_after_solve() {
        let refs = vec![reference("a", 0.0, 0.0), reference("b", 0.0, 0.001)];
        let cands = vec![
            candidate(0.0, 0.00002, "img.jpg"),
            candidate(0.0, 0.00101, "img.jpg"),
        ];
        let outcome = run(OPTIMAL, &refs, &cands, 20.0);
        assert_eq!(outcome.matched_count(), 1);
        assert_eq!(outcome.assignments[0].reference, 1);
        assert_eq!(outcome.unmatched_references, vec![0]);
    }

    #[test]
    fn test_components_equal_full_matrix_optimum() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let refs: Vec<_> = (0..25)
                .map(|i| {
                    reference(
                        &format!("r{i}"),
                        rng.gen_range(0.0..0.003),
                        rng.gen_range(0.0..0.003),
                    )
                })
                .collect();
            let cands: Vec<_> = (0..30)
                .map(|_| candidate(rng.gen_range(0.0..0.003), rng.gen_range(0.0..0.003), ""))
                .collect();
            let radius = 45.0;

            let ref_index = SpatialIndex::build(&refs, IndexBackend::RTree);
            let cand_index = SpatialIndex::build(&cands, IndexBackend::RTree);
            let outcome =
                match_optimal_assignment(&refs, &cands, radius, &ref_index, &cand_index);

            let mut full = CostMatrix::new(refs.len(), cands.len(), OUT_OF_RANGE_COST);
            for (r, reference) in refs.iter().enumerate() {
                for (c, cand) in cands.iter().enumerate() {
                    let d = distance(reference, cand);
                    if d <= radius {
                        full.set(r, c, d);
                    }
                }
            }
            let full_assignment = solve(&full);
            let full_pairs: Vec<f64> = full_assignment
                .iter()
                .enumerate()
                .filter_map(|(r, c)| c.map(|c| full.get(r, c)))
                .filter(|&d| d < OUT_OF_RANGE_COST)
                .collect();

            assert_eq!(outcome.matched_count(), full_pairs.len());
            let component_total: f64 = outcome.assignments.iter().map(|a| a.distance_m).sum();
            let full_total: f64 = full_pairs.iter().sum();
            assert_relative_eq!(component_total, full_total, epsilon = 1e-3);
            assert!(assignment_cost(&full, &full_assignment).is_finite());
        }
    }

    #[test]
    fn test_no_candidates_in_range() {
        let refs = vec![reference("a", 0.0, 0.0)];
        let cands = vec![candidate(0.0, 0.01, "x")];
        let outcome = run(OPTIMAL, &refs, &cands, 50.0);
        assert_eq!(outcome.matched_count(), 0);
        assert_eq!(outcome.unmatched_references, vec![0]);
    }
}
