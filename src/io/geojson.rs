//! GeoJSON map layers.
//!
//! [`coverage_layer`] renders a report as one point feature per matched
//! reference, undetected reference and new finding. Each feature carries a
//! `status` and a display `color`. Unclaimed candidates are not drawn.
//!
//! [`reference_layer`] renders the registry alone, without statuses.

use serde::Serialize;

use crate::core::types::{BoundingBox, Cluster, ReferencePoint};
use crate::engine::report::{CoverageReport, MatchedReference, UnmatchedCandidate};

/// Per-feature match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Undetected,
    NewFinding,
}

impl MatchStatus {
    /// Hex display color.
    pub fn color(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "#3b82f6",
            MatchStatus::Undetected => "#ef4444",
            MatchStatus::NewFinding => "#eab308",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: Point,
    pub properties: FeatureProperties,
}

/// GeoJSON point; `coordinates` are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    #[serde(rename = "type")]
    kind: &'static str,
    pub coordinates: [f64; 2],
}

impl Point {
    fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: "Point",
            coordinates: [longitude, latitude],
        }
    }
}

/// Feature attributes. Fields that do not apply to a status are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,

    // Reference attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_attribute: Option<i64>,

    // Candidate attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_longitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_reference_distance: Option<f64>,
}

impl FeatureProperties {
    fn with_status(status: MatchStatus) -> Self {
        Self {
            status: Some(status),
            color: Some(status.color()),
            ..Default::default()
        }
    }

    fn set_reference(&mut self, reference: &ReferencePoint) {
        self.id = Some(reference.id.clone());
        self.category = Some(reference.category.clone());
        self.label = Some(reference.label.clone());
        self.numeric_attribute = reference.numeric_attribute;
    }

    fn set_candidate(&mut self, candidate: &Cluster) {
        self.class_name = Some(candidate.class_name.clone());
        self.confidence = Some(candidate.confidence);
        self.source_ref = Some(candidate.representative_source_ref.clone());
        self.member_count = Some(candidate.member_count);
        self.bbox = candidate.bbox;
    }
}

fn feature(latitude: f64, longitude: f64, properties: FeatureProperties) -> Feature {
    Feature {
        kind: "Feature",
        geometry: Point::new(latitude, longitude),
        properties,
    }
}

fn matched_feature(m: &MatchedReference) -> Feature {
    let mut properties = FeatureProperties::with_status(MatchStatus::Matched);
    properties.set_reference(&m.reference);
    properties.set_candidate(&m.candidate);
    properties.candidate_latitude = Some(m.candidate.latitude);
    properties.candidate_longitude = Some(m.candidate.longitude);
    properties.match_distance = Some(m.distance_m);
    feature(m.reference.latitude, m.reference.longitude, properties)
}

fn undetected_feature(reference: &ReferencePoint) -> Feature {
    let mut properties = FeatureProperties::with_status(MatchStatus::Undetected);
    properties.set_reference(reference);
    feature(reference.latitude, reference.longitude, properties)
}

fn new_finding_feature(finding: &UnmatchedCandidate) -> Feature {
    let mut properties = FeatureProperties::with_status(MatchStatus::NewFinding);
    properties.set_candidate(&finding.candidate);
    properties.nearest_reference_distance = finding.nearest_reference_distance_m;
    feature(
        finding.candidate.latitude,
        finding.candidate.longitude,
        properties,
    )
}

/// Matched, undetected and new-finding features, in that order.
pub fn coverage_layer(report: &CoverageReport) -> FeatureCollection {
    let features = report
        .matched
        .iter()
        .map(matched_feature)
        .chain(report.undetected.iter().map(undetected_feature))
        .chain(report.new_findings.iter().map(new_finding_feature))
        .collect();
    FeatureCollection::new(features)
}

/// One feature per reference point.
pub fn reference_layer(references: &[ReferencePoint]) -> FeatureCollection {
    let features = references
        .iter()
        .map(|reference| {
            let mut properties = FeatureProperties::default();
            properties.set_reference(reference);
            feature(reference.latitude, reference.longitude, properties)
        })
        .collect();
    FeatureCollection::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::spatial_index::IndexBackend;
    use crate::core::types::Detection;
    use crate::engine::analyzer::{AnalysisParams, run_analysis};

    fn sample_report() -> CoverageReport {
        let references = vec![
            ReferencePoint::new("S-1", 0.0, 0.0).with_category("stop"),
            ReferencePoint::new("S-2", 0.0, 0.01).with_label("Main St"),
        ];
        let detections = vec![
            Detection::new(0.0001, 0.0)
                .with_class("stop_sign", 0.9)
                .with_source("a.jpg")
                .with_bbox(BoundingBox {
                    x1: 1.0,
                    y1: 2.0,
                    x2: 3.0,
                    y2: 4.0,
                }),
            Detection::new(1.0, 1.0).with_class("yield", 0.6).with_source("b.jpg"),
        ];
        run_analysis(
            &references,
            &detections,
            &AnalysisParams::default(),
            IndexBackend::RTree,
            &mut (),
        )
        .unwrap()
    }

    #[test]
    fn test_coverage_layer_statuses() {
        let layer = coverage_layer(&sample_report());
        let statuses: Vec<MatchStatus> = layer
            .features
            .iter()
            .filter_map(|f| f.properties.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                MatchStatus::Matched,
                MatchStatus::Undetected,
                MatchStatus::NewFinding
            ]
        );
    }

    #[test]
    fn test_feature_json_shape() {
        let json = serde_json::to_value(coverage_layer(&sample_report())).unwrap();
        assert_eq!(json["type"], "FeatureCollection");

        let matched = &json["features"][0];
        assert_eq!(matched["type"], "Feature");
        assert_eq!(matched["geometry"]["type"], "Point");
        assert_eq!(matched["geometry"]["coordinates"][0], 0.0);
        assert_eq!(matched["properties"]["status"], "matched");
        assert_eq!(matched["properties"]["color"], "#3b82f6");
        assert_eq!(matched["properties"]["id"], "S-1");
        assert_eq!(matched["properties"]["source_ref"], "a.jpg");
        assert_eq!(matched["properties"]["bbox"]["x2"], 3.0);
        assert!(matched["properties"]["match_distance"].as_f64().unwrap() < 12.0);

        let undetected = &json["features"][1];
        assert_eq!(undetected["properties"]["color"], "#ef4444");
        assert_eq!(undetected["properties"]["label"], "Main St");
        assert!(undetected["properties"].get("class_name").is_none());

        let finding = &json["features"][2];
        assert_eq!(finding["properties"]["status"], "new_finding");
        assert_eq!(finding["properties"]["color"], "#eab308");
        assert_eq!(finding["geometry"]["coordinates"][1], 1.0);
        assert!(finding["properties"]["nearest_reference_distance"].as_f64().unwrap() > 100_000.0);
    }

    #[test]
    fn test_reference_layer() {
        let references = vec![
            ReferencePoint::new("S-1", 40.7, -74.0).with_numeric_attribute(25),
            ReferencePoint::new("S-2", 40.8, -74.1),
        ];
        let layer = reference_layer(&references);
        assert_eq!(layer.len(), 2);
        assert!(layer.features.iter().all(|f| f.properties.status.is_none()));

        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["features"][0]["properties"]["numeric_attribute"], 25);
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], -74.0);
        assert!(json["features"][1]["properties"].get("numeric_attribute").is_none());
    }

    #[test]
    fn test_empty_report_layer() {
        let report = run_analysis(
            &[],
            &[],
            &AnalysisParams::default(),
            IndexBackend::RTree,
            &mut (),
        )
        .unwrap();
        assert!(coverage_layer(&report).is_empty());
    }
}
