//! JSON record files.
//!
//! Inputs are JSON arrays of already-structured [`ReferencePoint`] or
//! [`Detection`] records. Coordinates are checked here so the engine only
//! ever sees finite, in-range values.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::types::{Detection, GeoPoint, ReferencePoint};
use crate::error::{CoverageError, Result};

/// Load and validate reference points.
pub fn load_references(path: impl AsRef<Path>) -> Result<Vec<ReferencePoint>> {
    let references: Vec<ReferencePoint> = read_json(path.as_ref())?;
    validate_coordinates(&references)?;
    Ok(references)
}

/// Load and validate detections.
pub fn load_detections(path: impl AsRef<Path>) -> Result<Vec<Detection>> {
    let detections: Vec<Detection> = read_json(path.as_ref())?;
    validate_coordinates(&detections)?;
    for (index, detection) in detections.iter().enumerate() {
        if !detection.confidence.is_finite() {
            return Err(CoverageError::InvalidRecord {
                index,
                reason: format!("confidence {} is not finite", detection.confidence),
            });
        }
    }
    Ok(detections)
}

/// Reject records whose latitude or longitude is non-finite or out of range.
pub fn validate_coordinates<P: GeoPoint>(points: &[P]) -> Result<()> {
    for (index, p) in points.iter().enumerate() {
        let (lat, lon) = (p.latitude(), p.longitude());
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoverageError::InvalidRecord {
                index,
                reason: format!("latitude {lat} out of range"),
            });
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(CoverageError::InvalidRecord {
                index,
                reason: format!("longitude {lon} out of range"),
            });
        }
    }
    Ok(())
}

/// Pretty-print `value` as JSON to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::debug!("Wrote {}", path.as_ref().display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_references() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.json");
        fs::write(
            &path,
            r#"[
                {"id": "S-1", "latitude": 40.7, "longitude": -74.0, "category": "stop"},
                {"id": "S-2", "latitude": 40.8, "longitude": -74.1, "numeric_attribute": 25}
            ]"#,
        )
        .unwrap();

        let refs = load_references(&path).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].category, "stop");
        assert_eq!(refs[1].label, "");
        assert_eq!(refs[1].numeric_attribute, Some(25));
    }

    #[test]
    fn test_load_detections_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dets.json");
        fs::write(
            &path,
            r#"[{"latitude": 40.7, "longitude": -74.0, "class_name": "stop", "confidence": 0.8,
                 "source_ref": "a.jpg", "bbox": {"x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0}},
                {"latitude": 40.71, "longitude": -74.0}]"#,
        )
        .unwrap();

        let dets = load_detections(&path).unwrap();
        assert_eq!(dets.len(), 2);
        assert!(dets[0].bbox.is_some());
        assert_eq!(dets[1].source_ref, "");
    }

    #[test]
    fn test_missing_coordinate_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.json");
        fs::write(&path, r#"[{"id": "S-1", "latitude": 40.7}]"#).unwrap();
        assert!(matches!(load_references(&path), Err(CoverageError::Json(_))));
    }

    #[test]
    fn test_out_of_range_coordinate_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dets.json");
        fs::write(
            &path,
            r#"[{"latitude": 1.0, "longitude": 1.0}, {"latitude": 91.0, "longitude": 0.0}]"#,
        )
        .unwrap();
        let err = load_detections(&path).unwrap_err();
        assert!(matches!(err, CoverageError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_references(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CoverageError::Io(_)));
    }

    #[test]
    fn test_write_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &vec![1, 2, 3]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let back: Vec<i32> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
