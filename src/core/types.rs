//! Geo-tagged records consumed and produced by the engine.
//!
//! - [`ReferencePoint`]: authoritative marker from the reference registry
//! - [`Detection`]: sensor-derived observation
//! - [`Cluster`]: centroid of mutually close detections
//!
//! Both [`Detection`] and [`Cluster`] implement [`Candidate`], so the matchers
//! accept either side of the clustering step.

use serde::{Deserialize, Serialize};

/// Anything with a latitude and longitude in degrees.
pub trait GeoPoint {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

/// A matchable observation.
pub trait Candidate: GeoPoint {
    /// Identifier of the originating sensor capture.
    ///
    /// One capture may contribute at most one match. An empty string means
    /// the capture is unknown and no single-use constraint applies.
    fn source_ref(&self) -> &str;
}

/// Pixel bounding box of a detection within its source capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Authoritative marker from the reference registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub label: String,
    /// Optional numeric property (e.g. a posted limit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_attribute: Option<i64>,
}

impl ReferencePoint {
    /// Create a reference point with empty category and label.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            category: String::new(),
            label: String::new(),
            numeric_attribute: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_numeric_attribute(mut self, value: i64) -> Self {
        self.numeric_attribute = Some(value);
        self
    }
}

impl GeoPoint for ReferencePoint {
    #[inline]
    fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Sensor-derived observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub source_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    /// Create a detection with no class, zero confidence and no source.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            class_name: String::new(),
            confidence: 0.0,
            source_ref: String::new(),
            bbox: None,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>, confidence: f64) -> Self {
        self.class_name = class_name.into();
        self.confidence = confidence;
        self
    }

    pub fn with_source(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = source_ref.into();
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

impl GeoPoint for Detection {
    #[inline]
    fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Candidate for Detection {
    #[inline]
    fn source_ref(&self) -> &str {
        &self.source_ref
    }
}

/// Centroid of a group of mutually close detections.
///
/// Class, confidence, bounding box and source are copied from the
/// highest-confidence member. Holds no reference back to its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub latitude: f64,
    pub longitude: f64,
    pub class_name: String,
    pub confidence: f64,
    pub member_count: usize,
    pub representative_source_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Cluster {
    /// A single-member cluster carrying the detection's own attributes.
    pub fn from_detection(detection: &Detection) -> Self {
        Self {
            latitude: detection.latitude,
            longitude: detection.longitude,
            class_name: detection.class_name.clone(),
            confidence: detection.confidence,
            member_count: 1,
            representative_source_ref: detection.source_ref.clone(),
            bbox: detection.bbox,
        }
    }
}

impl GeoPoint for Cluster {
    #[inline]
    fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Candidate for Cluster {
    #[inline]
    fn source_ref(&self) -> &str {
        &self.representative_source_ref
    }
}
