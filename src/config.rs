//! # Generation Configuration
//!
//! Every knob of a build, loadable from JSON. Missing fields take their
//! defaults, so `{}` is a valid config file.
//!
//! ```json
//! {
//!     "grid_size": 512,
//!     "block_size": { "width": 1.0, "height": 1.0, "depth": 1.0 },
//!     "output_range": { "min": 0, "max": 320 },
//!     "worker_count": 8,
//!     "queue_depth": 64,
//!     "progress_interval": 0
//! }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    raster::OutputRange,
    task_management::{default_worker_count, DEFAULT_QUEUE_DEPTH},
    world::block::BlockSize,
};

/// Number of progress callbacks per build when `progress_interval` is 0.
pub const DEFAULT_PROGRESS_STEPS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Side of the square grid. `None` uses `min(width, height)` of the raster.
    pub grid_size: Option<usize>,
    pub block_size: BlockSize,
    pub output_range: OutputRange,
    /// `None` uses the hardware parallelism.
    pub worker_count: Option<usize>,
    /// Tasks buffered per worker before submission blocks.
    pub queue_depth: usize,
    /// Completed units between progress callbacks; 0 picks
    /// `total / DEFAULT_PROGRESS_STEPS`.
    pub progress_interval: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            grid_size: None,
            block_size: BlockSize::default(),
            output_range: OutputRange::default(),
            worker_count: None,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            progress_interval: 0,
        }
    }
}

impl GenerationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = Some(grid_size);
        self
    }

    pub fn with_block_size(mut self, block_size: BlockSize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = Some(worker_count);
        self
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: usize) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == Some(0) {
            return Err(ConfigError::Invalid("worker_count must be at least 1".into()));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid("queue_depth must be at least 1".into()));
        }
        if !self.block_size.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "block_size must be positive and finite, got {:?}",
                self.block_size
            )));
        }
        self.output_range
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(default_worker_count)
    }

    /// Units between progress callbacks for a build of `total` units, at least 1.
    pub fn resolved_progress_interval(&self, total: usize) -> usize {
        if self.progress_interval > 0 {
            self.progress_interval
        } else {
            (total / DEFAULT_PROGRESS_STEPS).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = GenerationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, GenerationConfig::default());
        assert_eq!(config.output_range, OutputRange { min: 0, max: 320 });
        assert_eq!(config.block_size, BlockSize::uniform(1.0));
        assert!(config.resolved_worker_count() >= 1);
    }

    #[test]
    fn parses_every_field() {
        let config = GenerationConfig::from_json_str(
            r#"{
                "grid_size": 16,
                "block_size": { "width": 2.0, "height": 0.5, "depth": 2.0 },
                "output_range": { "min": -64, "max": 256 },
                "worker_count": 3,
                "queue_depth": 8,
                "progress_interval": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.grid_size, Some(16));
        assert_eq!(config.block_size.height, 0.5);
        assert_eq!(config.output_range, OutputRange { min: -64, max: 256 });
        assert_eq!(config.resolved_worker_count(), 3);
        assert_eq!(config.queue_depth, 8);
        assert_eq!(config.resolved_progress_interval(1000), 10);
    }

    #[test]
    fn rejects_invalid_values() {
        for json in [
            r#"{ "worker_count": 0 }"#,
            r#"{ "queue_depth": 0 }"#,
            r#"{ "block_size": { "width": 0.0, "height": 1.0, "depth": 1.0 } }"#,
            r#"{ "output_range": { "min": 10, "max": 0 } }"#,
        ] {
            assert!(
                matches!(GenerationConfig::from_json_str(json), Err(ConfigError::Invalid(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            GenerationConfig::from_json_str("{ grid_size: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn default_progress_interval_scales_with_total() {
        let config = GenerationConfig::default();
        assert_eq!(config.resolved_progress_interval(0), 1);
        assert_eq!(config.resolved_progress_interval(10), 1);
        assert_eq!(config.resolved_progress_interval(4000), 200);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            GenerationConfig::from_json_file("/nonexistent/topoblock.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
