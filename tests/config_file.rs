//! Loading configuration files from disk.

use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use pramana::{Config, CoverageAnalyzer, CoverageError, IndexBackend, MatchAlgorithm};

#[test]
fn test_load_full_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pramana.toml");
    fs::write(
        &path,
        r#"
[analysis]
radius_meters = 35.0
cluster_radius_meters = 0.0
algorithm = "hungarian"

[index]
backend = "linear"

[cache]
enabled = true
ttl_secs = 60
max_entries = 4
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.analysis.radius_meters, 35.0);
    assert_eq!(config.analysis.cluster_radius_meters, 0.0);
    assert_eq!(config.analysis.algorithm, MatchAlgorithm::OptimalAssignment);
    assert_eq!(config.index.backend, IndexBackend::Linear);
    assert_eq!(config.cache.ttl(), Duration::from_secs(60));

    let analyzer = CoverageAnalyzer::new(&config);
    assert_eq!(analyzer.backend(), IndexBackend::Linear);
    assert_eq!(analyzer.cache().unwrap().ttl(), Duration::from_secs(60));
}

#[test]
fn test_disabled_cache() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pramana.toml");
    fs::write(&path, "[cache]\nenabled = false\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert!(CoverageAnalyzer::new(&config).cache().is_none());
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = Config::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, CoverageError::Io(_)));
}

#[test]
fn test_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pramana.toml");
    fs::write(&path, "[analysis\nradius_meters = ").unwrap();
    assert!(matches!(Config::load(&path), Err(CoverageError::Config(_))));
}

#[test]
fn test_unknown_algorithm_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pramana.toml");
    fs::write(&path, "[analysis]\nalgorithm = \"mutual_nearst\"\n").unwrap();
    assert!(matches!(
        Config::load(&path),
        Err(CoverageError::InvalidAlgorithm(name)) if name == "mutual_nearst"
    ));
}

#[test]
fn test_negative_cluster_radius_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pramana.toml");
    fs::write(&path, "[analysis]\ncluster_radius_meters = -3.0\n").unwrap();
    assert!(matches!(
        Config::load(&path),
        Err(CoverageError::InvalidRadius {
            parameter: "cluster_radius_meters",
            ..
        })
    ));
}

#[test]
fn test_sample_config_parses() {
    let sample = include_str!("../pramana.toml");
    let config = Config::from_toml_str(sample).unwrap();
    assert_eq!(config.analysis.radius_meters, 50.0);
    assert_eq!(config.index.backend, IndexBackend::RTree);
}
