//! Configuration management for SkipKV
//!
//! Provides index shape presets (tower height, promotion probability)
//! and the snapshot location used by the `Store` facade.

use std::path::PathBuf;

use crate::level::MAX_LEVELS;

/// Default snapshot file, relative to the working directory
pub const DEFAULT_SNAPSHOT_PATH: &str = "data_file";

/// SkipKV configuration with index shape presets
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of levels a node may occupy
    pub max_height: usize,
    /// Probability that a node is promoted to the next level
    pub probability: f64,
    /// Fixed RNG seed for reproducible layouts (None = OS entropy)
    pub seed: Option<u64>,
    /// Snapshot file that `Store::open` loads and `Store::save` writes
    pub snapshot_path: PathBuf,
    /// Call durable_sync after every snapshot dump
    pub sync_on_dump: bool,
}

impl Config {
    /// General purpose: 32 levels, quarter promotion
    pub fn standard() -> Self {
        Self {
            max_height: 32,
            probability: 0.25,
            seed: None,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            sync_on_dump: true,
        }
    }

    /// Small datasets: 12 levels (4^12 keys before towers saturate)
    pub fn compact() -> Self {
        Self {
            max_height: 12,
            ..Self::standard()
        }
    }

    /// Reproducible layouts for tests and debugging; skips fsync
    pub fn deterministic(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            sync_on_dump: false,
            ..Self::standard()
        }
    }

    pub fn with_snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.max_height == 0 || self.max_height > MAX_LEVELS {
            return Err(format!("max_height must be in [1, {}]", MAX_LEVELS));
        }
        if !(self.probability > 0.0 && self.probability < 1.0) {
            return Err("probability must be in (0.0, 1.0)".into());
        }
        if self.snapshot_path.as_os_str().is_empty() {
            return Err("snapshot_path must not be empty".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::standard() }
}
