//! Radius-based deduplication of detections.
//!
//! Every pair of detections within the cluster radius is unioned in a
//! disjoint-set forest; each connected component becomes one [`Cluster`].
//!
//! - Centroid: arithmetic mean of member lat/lon (fine for radii ≪ Earth radius)
//! - Representative: highest-confidence member, ties to the lowest input index
//! - Output order: by each cluster's first member in input order

use std::cmp::Ordering;

use super::spatial_index::{IndexBackend, SpatialIndex};
use crate::core::types::{Cluster, Detection};

/// Disjoint-set forest over `0..n` with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of `x`'s set.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
        true
    }

    /// Members of every set, each sorted ascending, sets ordered by their
    /// smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut slot_of_root = vec![usize::MAX; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = self.find(i);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot_of_root[root]].push(i);
        }
        groups
    }
}

/// Group detections within `radius_meters` of each other into clusters.
///
/// Grouping is transitive: a chain of detections each within the radius of
/// the next forms one cluster even if its ends are farther apart.
pub fn cluster_detections(
    detections: &[Detection],
    radius_meters: f64,
    backend: IndexBackend,
) -> Vec<Cluster> {
    if detections.is_empty() {
        return Vec::new();
    }

    let index = SpatialIndex::build(detections, backend);
    let pairs = index.self_pairs_within(radius_meters);

    let mut sets = UnionFind::new(detections.len());
    for &(i, j) in &pairs {
        sets.union(i, j);
    }

    let clusters: Vec<Cluster> = sets
        .groups()
        .iter()
        .map(|members| build_cluster(detections, members))
        .collect();

    log::debug!(
        "Clustered {} detections into {} clusters ({} pairs within {:.1}m)",
        detections.len(),
        clusters.len(),
        pairs.len(),
        radius_meters
    );

    clusters
}

/// One single-member cluster per detection, in input order.
pub fn singleton_clusters(detections: &[Detection]) -> Vec<Cluster> {
    detections.iter().map(Cluster::from_detection).collect()
}

/// Build a cluster from member indices (ascending).
fn build_cluster(detections: &[Detection], members: &[usize]) -> Cluster {
    let count = members.len() as f64;
    let latitude = members.iter().map(|&i| detections[i].latitude).sum::<f64>() / count;
    let longitude = members.iter().map(|&i| detections[i].longitude).sum::<f64>() / count;

    // Members are ascending, so keeping the first maximum breaks ties by index.
    let mut best = members[0];
    for &i in &members[1..] {
        if detections[i]
            .confidence
            .total_cmp(&detections[best].confidence)
            == Ordering::Greater
        {
            best = i;
        }
    }
    let representative = &detections[best];

    Cluster {
        latitude,
        longitude,
        class_name: representative.class_name.clone(),
        confidence: representative.confidence,
        member_count: members.len(),
        representative_source_ref: representative.source_ref.clone(),
        bbox: representative.bbox,
    }
}
