//! Core service configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tessera_filter::DEFAULT_PARALLEL_THRESHOLD;
use tessera_index::LayerLimits;
use tessera_model::LayerConfig;

/// Settings of one [`SpatialCore`](crate::SpatialCore)
///
/// Every field has a default, so a TOML file only lists what it changes:
///
/// ```toml
/// tile_cache_capacity = 512
///
/// [layer_limits]
/// override_layers = true
/// max_visible_layers = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Cell tables at or above this size are partitioned with rayon
    pub filter_parallel_threshold: usize,
    /// Bound of the filter worker's request queue
    pub worker_queue_depth: usize,
    /// Events buffered per subscriber before lagging
    pub event_capacity: usize,
    /// Decoded tiles kept in memory
    pub tile_cache_capacity: u64,
    /// Archive members above this size abort ingestion
    pub max_member_bytes: Option<u64>,
    /// JSON file backing the persisted flags
    pub flags_path: Option<PathBuf>,
    /// Pyramid geometry used until an archive provides its own
    pub default_layer_config: LayerConfig,
    /// Pyramid levels allowed on screen
    pub layer_limits: LayerLimits,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            filter_parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            worker_queue_depth: 64,
            event_capacity: 256,
            tile_cache_capacity: 1024,
            max_member_bytes: None,
            flags_path: None,
            default_layer_config: LayerConfig::default(),
            layer_limits: LayerLimits::default(),
        }
    }
}

impl CoreConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Toml` on syntax or type errors
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Toml` if it does not parse
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded core config");
        Ok(config)
    }

    #[inline]
    #[must_use]
    pub fn with_filter_parallel_threshold(mut self, threshold: usize) -> Self {
        self.filter_parallel_threshold = threshold;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_worker_queue_depth(mut self, depth: usize) -> Self {
        self.worker_queue_depth = depth;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tile_cache_capacity(mut self, capacity: u64) -> Self {
        self.tile_cache_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_member_bytes(mut self, limit: u64) -> Self {
        self.max_member_bytes = Some(limit);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_flags_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.flags_path = Some(path.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default_layer_config(mut self, layer: LayerConfig) -> Self {
        self.default_layer_config = layer;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_layer_limits(mut self, limits: LayerLimits) -> Self {
        self.layer_limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CoreConfig::from_toml_str(
            r"
            tile_cache_capacity = 16
            max_member_bytes = 1048576

            [layer_limits]
            override_layers = true
            max_visible_layers = 2
            ",
        )
        .unwrap();

        assert_eq!(config.tile_cache_capacity, 16);
        assert_eq!(config.max_member_bytes, Some(1_048_576));
        assert_eq!(config.layer_limits, LayerLimits::finest(2));
        assert_eq!(config.worker_queue_depth, 64);
        assert_eq!(config.default_layer_config, LayerConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(matches!(
            CoreConfig::from_toml_str("event_capacity = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessera.toml");
        std::fs::write(&path, "worker_queue_depth = 8\n").unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config, CoreConfig::new().with_worker_queue_depth(8));

        assert!(matches!(
            CoreConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
