//! Core foundation layer.
//!
//! Bottom layer of the engine with no internal dependencies.
//!
//! # Contents
//!
//! - [`types`]: Reference points, detections and clusters
//! - [`geodesy`]: Haversine distance and unit-sphere projection

pub mod geodesy;
pub mod types;

pub use geodesy::{EARTH_RADIUS_METERS, distance, haversine_distance};
pub use types::{BoundingBox, Candidate, Cluster, Detection, GeoPoint, ReferencePoint};
