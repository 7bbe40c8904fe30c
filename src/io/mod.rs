//! Infrastructure layer.
//!
//! # Contents
//!
//! - [`records`]: JSON input files for references and detections
//! - [`geojson`]: Map-layer rendering of reports and the reference registry

pub mod geojson;
pub mod records;

pub use geojson::{FeatureCollection, MatchStatus, coverage_layer, reference_layer};
pub use records::{load_detections, load_references, write_json};
