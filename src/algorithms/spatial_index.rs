//! Spatial index over unit-sphere projections of lat/lon points.
//!
//! Uses an R-tree in 3D Cartesian space to answer:
//! - All points within a geodesic radius
//! - Nearest point
//! - All cross-set (or same-set) pairs within a radius
//!
//! Radius queries are run in chord space with a small safety margin and then
//! refined by exact haversine distance, so the R-tree and the pairwise
//! [`IndexBackend::Linear`] scan return identical results. Ties are always
//! broken by point index.

use std::cmp::Ordering;
use std::f64::consts::PI;

use clap::ValueEnum;
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

use crate::core::geodesy::{
    EARTH_RADIUS_METERS, chord_distance_sq, haversine_distance, meters_to_chord_length,
    to_unit_sphere,
};
use crate::core::types::GeoPoint;

/// Relative slack applied to chord radii before refinement.
const CHORD_RELATIVE_SLACK: f64 = 1e-9;

/// Absolute slack applied to chord radii (~6 µm on the Earth's surface).
const CHORD_ABSOLUTE_SLACK: f64 = 1e-12;

/// Query structure backing a [`SpatialIndex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// R-tree over unit-sphere points.
    #[default]
    #[value(name = "rtree")]
    RTree,

    /// Pairwise scan. Same results, O(n·m).
    Linear,
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackend::RTree => write!(f, "rtree"),
            IndexBackend::Linear => write!(f, "linear"),
        }
    }
}

/// A projected point with its index for R-tree storage.
#[derive(Clone, Copy, Debug)]
struct IndexedPoint {
    position: [f64; 3],
    index: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        chord_distance_sq(&self.position, point)
    }
}

/// A query hit: point index and exact geodesic distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance_m: f64,
}

impl Neighbor {
    /// Order by distance, then by index.
    #[inline]
    pub fn cmp_by_distance(&self, other: &Neighbor) -> Ordering {
        self.distance_m
            .total_cmp(&other.distance_m)
            .then(self.index.cmp(&other.index))
    }
}

/// Spatial index over a set of geo points.
///
/// # Example
/// ```rust
/// use pramana::algorithms::spatial_index::{IndexBackend, SpatialIndex};
/// use pramana::core::ReferencePoint;
///
/// let points = vec![
///     ReferencePoint::new("a", 0.0, 0.0),
///     ReferencePoint::new("b", 0.0, 0.001),
/// ];
/// let index = SpatialIndex::build(&points, IndexBackend::RTree);
///
/// let hits = index.within_radius(0.0, 0.0, 50.0);
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].index, 0);
/// ```
#[derive(Clone)]
pub struct SpatialIndex {
    coords: Vec<(f64, f64)>,
    positions: Vec<[f64; 3]>,
    tree: Option<RTree<IndexedPoint>>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len())
            .field("backend", &self.backend())
            .finish()
    }
}

impl SpatialIndex {
    /// Build an index over `points`.
    ///
    /// Falls back to [`IndexBackend::Linear`] when any coordinate is not
    /// finite, since the R-tree cannot order such points.
    pub fn build<P: GeoPoint>(points: &[P], backend: IndexBackend) -> Self {
        let coords: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (p.latitude(), p.longitude()))
            .collect();
        let positions: Vec<[f64; 3]> = coords
            .iter()
            .map(|&(lat, lon)| to_unit_sphere(lat, lon))
            .collect();

        let tree = match backend {
            IndexBackend::Linear => None,
            IndexBackend::RTree => {
                if positions.iter().flatten().all(|v| v.is_finite()) {
                    let indexed: Vec<IndexedPoint> = positions
                        .iter()
                        .enumerate()
                        .map(|(index, &position)| IndexedPoint { position, index })
                        .collect();
                    Some(RTree::bulk_load(indexed))
                } else {
                    log::warn!(
                        "Non-finite coordinates among {} points, using pairwise scan",
                        positions.len()
                    );
                    None
                }
            }
        };

        Self {
            coords,
            positions,
            tree,
        }
    }

    /// Backend actually in use.
    pub fn backend(&self) -> IndexBackend {
        if self.tree.is_some() {
            IndexBackend::RTree
        } else {
            IndexBackend::Linear
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Indices of all points within `chord_radius` of `query` on the unit
    /// sphere, in ascending order.
    pub fn range_query(&self, query: &[f64; 3], chord_radius: f64) -> Vec<usize> {
        let max_sq = chord_radius * chord_radius;
        let mut hits: Vec<usize> = match &self.tree {
            Some(tree) => tree
                .locate_within_distance(*query, max_sq)
                .map(|p| p.index)
                .collect(),
            None => self
                .positions
                .iter()
                .enumerate()
                .filter(|(_, p)| chord_distance_sq(p, query) <= max_sq)
                .map(|(i, _)| i)
                .collect(),
        };
        hits.sort_unstable();
        hits
    }

    /// All points within `radius_m` meters of (`lat`, `lon`), sorted by
    /// distance then index.
    pub fn within_radius(&self, lat: f64, lon: f64, radius_m: f64) -> Vec<Neighbor> {
        self.within_radius_of(&to_unit_sphere(lat, lon), lat, lon, radius_m)
    }

    fn within_radius_of(
        &self,
        position: &[f64; 3],
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Vec<Neighbor> {
        if self.is_empty() || radius_m.is_nan() || radius_m < 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<Neighbor> = self
            .range_query(position, query_chord(radius_m))
            .into_iter()
            .filter_map(|index| {
                let (plat, plon) = self.coords[index];
                let distance_m = haversine_distance(lat, lon, plat, plon);
                (distance_m <= radius_m).then_some(Neighbor { index, distance_m })
            })
            .collect();
        hits.sort_by(Neighbor::cmp_by_distance);
        hits
    }

    /// Nearest point to (`lat`, `lon`). Ties go to the lowest index.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<Neighbor> {
        self.nearest_of(&to_unit_sphere(lat, lon), lat, lon)
    }

    fn nearest_of(&self, position: &[f64; 3], lat: f64, lon: f64) -> Option<Neighbor> {
        let exact = |index: usize| {
            let (plat, plon) = self.coords[index];
            Neighbor {
                index,
                distance_m: haversine_distance(lat, lon, plat, plon),
            }
        };

        match &self.tree {
            Some(tree) => {
                let first = tree.nearest_neighbor(position)?;
                // Gather everything at (almost) the same chord distance and
                // settle ties on exact distance and index.
                let chord = first.distance_2(position).sqrt();
                let ball = chord * (1.0 + CHORD_RELATIVE_SLACK) + CHORD_ABSOLUTE_SLACK;
                self.range_query(position, ball)
                    .into_iter()
                    .map(exact)
                    .min_by(Neighbor::cmp_by_distance)
                    .or_else(|| Some(exact(first.index)))
            }
            None => (0..self.len()).map(exact).min_by(Neighbor::cmp_by_distance),
        }
    }

    /// For each point of `self`, the points of `other` within `radius_m`.
    pub fn neighbors_within(&self, other: &SpatialIndex, radius_m: f64) -> Vec<Vec<Neighbor>> {
        self.positions
            .iter()
            .zip(&self.coords)
            .map(|(position, &(lat, lon))| other.within_radius_of(position, lat, lon, radius_m))
            .collect()
    }

    /// For each point of `self`, its nearest point in `other`.
    pub fn nearest_in(&self, other: &SpatialIndex) -> Vec<Option<Neighbor>> {
        self.positions
            .iter()
            .zip(&self.coords)
            .map(|(position, &(lat, lon))| other.nearest_of(position, lat, lon))
            .collect()
    }

    /// All `(i, j)` with `i` in `self`, `j` in `other`, within `radius_m`.
    ///
    /// Sorted by `i`, then by `j`.
    pub fn pairs_within(&self, other: &SpatialIndex, radius_m: f64) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, neighbors) in self.neighbors_within(other, radius_m).into_iter().enumerate() {
            let mut js: Vec<usize> = neighbors.into_iter().map(|n| n.index).collect();
            js.sort_unstable();
            pairs.extend(js.into_iter().map(|j| (i, j)));
        }
        pairs
    }

    /// All `(i, j)` with `i < j` within `radius_m` of each other.
    pub fn self_pairs_within(&self, radius_m: f64) -> Vec<(usize, usize)> {
        self.pairs_within(self, radius_m)
            .into_iter()
            .filter(|&(i, j)| i < j)
            .collect()
    }
}

/// Chord radius to query for a geodesic radius, including slack.
fn query_chord(radius_m: f64) -> f64 {
    let capped = radius_m.min(PI * EARTH_RADIUS_METERS);
    meters_to_chord_length(capped) * (1.0 + CHORD_RELATIVE_SLACK) + CHORD_ABSOLUTE_SLACK
}
