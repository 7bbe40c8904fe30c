//! Coverage algorithms layer.
//!
//! This layer contains the algorithmic building blocks for coverage analysis.
//!
//! # Contents
//!
//! - [`spatial_index`]: R-tree and pairwise radius/nearest queries on the sphere
//! - [`clustering`]: Union-find deduplication of detections
//! - [`matching`]: Greedy, optimal and mutual-nearest one-to-one matchers

pub mod clustering;
pub mod matching;
pub mod spatial_index;

pub use clustering::{UnionFind, cluster_detections, singleton_clusters};
pub use matching::{MatchAlgorithm, MatchAssignment, MatchOutcome, match_points};
pub use spatial_index::{IndexBackend, Neighbor, SpatialIndex};
