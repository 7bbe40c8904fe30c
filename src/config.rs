//! TOML configuration for the analyzer and the `pramana` binary.
//!
//! Every section is optional; missing sections and fields take their defaults.
//!
//! ```toml
//! [analysis]
//! radius_meters = 50.0
//! cluster_radius_meters = 30.0
//! algorithm = "greedy_nearest"
//!
//! [index]
//! backend = "rtree"
//!
//! [cache]
//! enabled = true
//! ttl_secs = 300
//! max_entries = 32
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::matching::MatchAlgorithm;
use crate::algorithms::spatial_index::IndexBackend;
use crate::engine::analyzer::AnalysisParams;
use crate::error::{CoverageError, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile")]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub index: IndexConfig,
    pub cache: CacheConfig,
}

/// Default parameters for an analysis call.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    /// Maximum reference-to-candidate distance for a match (meters).
    pub radius_meters: f64,
    /// Detection deduplication radius (meters). 0 disables clustering.
    pub cluster_radius_meters: f64,
    /// Matching algorithm.
    pub algorithm: MatchAlgorithm,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            radius_meters: 50.0,
            cluster_radius_meters: 30.0,
            algorithm: MatchAlgorithm::GreedyNearest,
        }
    }
}

impl AnalysisConfig {
    /// Parameters for an analysis call using these defaults.
    pub fn params(&self) -> AnalysisParams {
        AnalysisParams {
            radius_meters: self.radius_meters,
            cluster_radius_meters: self.cluster_radius_meters,
            algorithm: self.algorithm,
        }
    }
}

/// On-disk layout. The algorithm stays a plain name until it is checked
/// against the supported matchers.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    analysis: AnalysisSection,
    #[serde(default)]
    index: IndexConfig,
    #[serde(default)]
    cache: CacheConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AnalysisSection {
    radius_meters: f64,
    cluster_radius_meters: f64,
    algorithm: Option<String>,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let defaults = AnalysisConfig::default();
        Self {
            radius_meters: defaults.radius_meters,
            cluster_radius_meters: defaults.cluster_radius_meters,
            algorithm: None,
        }
    }
}

impl TryFrom<ConfigFile> for Config {
    type Error = CoverageError;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let algorithm = match file.analysis.algorithm {
            Some(name) => name.parse::<MatchAlgorithm>()?,
            None => AnalysisConfig::default().algorithm,
        };
        let config = Config {
            analysis: AnalysisConfig {
                radius_meters: file.analysis.radius_meters,
                cluster_radius_meters: file.analysis.cluster_radius_meters,
                algorithm,
            },
            index: file.index,
            cache: file.cache,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Spatial index settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached results before the oldest is evicted.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 32,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = basic_toml::from_str(contents)?;
        Config::try_from(file)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.analysis.params().validate()?;
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(CoverageError::Config(
                "cache.max_entries must be at least 1 when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
