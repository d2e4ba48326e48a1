//! Run configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, and command-line flags.
//!
//! ```yaml
//! server: http://forestwatchers.net/pybossa
//! app_name: besttile
//! max_tasks: 1056
//! max_answers: 30
//! build_completed: true
//! images_dir: /data/FAS_Brazil7
//! dest_dir: /data/results
//! full_build: true
//! remove_after_days: 30
//! ```

use crate::{BestTileError, Result};
use fwatch_raster::{DEFAULT_GDAL_MERGE, DEFAULT_GDAL_TRANSLATE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default task server.
pub const DEFAULT_SERVER: &str = "http://forestwatchers.net/pybossa";

/// Thresholds used by a full build, in run order.
pub const FULL_BUILD_THRESHOLDS: [u32; 6] = [0, 5, 10, 15, 20, 25];

/// Configuration for one invocation of the best-tile pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Task server address.
    pub server: String,
    /// Short name of the application.
    pub app_name: String,
    /// Key under a task run's `info` holding the answer.
    pub answer_key: String,
    /// Maximum number of tasks to download.
    pub max_tasks: u32,
    /// Maximum number of answers to download per task.
    pub max_answers: u32,
    /// Also build the completed-tasks products.
    pub build_completed: bool,
    /// Directory holding one source raster per acquisition.
    pub images_dir: PathBuf,
    /// Directory receiving the products.
    pub dest_dir: PathBuf,
    /// Build every threshold in [`FULL_BUILD_THRESHOLDS`] instead of just 0.
    pub full_build: bool,
    /// Delete `.tif` files in `dest_dir` older than this many days.
    pub remove_after_days: Option<u64>,
    /// HTTP timeout in seconds (none by default).
    pub http_timeout_secs: Option<u64>,
    /// Crop executable.
    pub gdal_translate: PathBuf,
    /// Merge executable.
    pub gdal_merge: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            app_name: "besttile".to_string(),
            answer_key: "besttile".to_string(),
            max_tasks: 1056,
            max_answers: 30,
            build_completed: true,
            images_dir: PathBuf::from("images"),
            dest_dir: PathBuf::from("results"),
            full_build: false,
            remove_after_days: None,
            http_timeout_secs: None,
            gdal_translate: PathBuf::from(DEFAULT_GDAL_TRANSLATE),
            gdal_merge: PathBuf::from(DEFAULT_GDAL_MERGE),
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(BestTileError::Config("server address is empty".to_string()));
        }
        if self.app_name.trim().is_empty() {
            return Err(BestTileError::Config("application name is empty".to_string()));
        }
        if self.max_tasks == 0 {
            return Err(BestTileError::Config("max_tasks must be at least 1".to_string()));
        }
        if self.max_answers == 0 {
            return Err(BestTileError::Config("max_answers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Minimum-answer thresholds for the all-tasks runs.
    pub fn thresholds(&self) -> Vec<u32> {
        if self.full_build {
            FULL_BUILD_THRESHOLDS.to_vec()
        } else {
            vec![0]
        }
    }

    /// HTTP timeout, if configured.
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.server, "http://forestwatchers.net/pybossa");
        assert_eq!(config.max_tasks, 1056);
        assert_eq!(config.max_answers, 30);
        assert!(config.build_completed);
        assert_eq!(config.thresholds(), vec![0]);
        assert_eq!(config.http_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml_str(
            "app_name: besttile2\nfull_build: true\nremove_after_days: 7\nhttp_timeout_secs: 20\n",
        )
        .unwrap();
        assert_eq!(config.app_name, "besttile2");
        assert_eq!(config.max_answers, 30);
        assert_eq!(config.remove_after_days, Some(7));
        assert_eq!(config.thresholds(), vec![0, 5, 10, 15, 20, 25]);
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = PipelineConfig::from_yaml_str("max_task: 3\n").unwrap_err();
        assert!(matches!(err, BestTileError::Yaml(_)));
    }

    #[test]
    fn test_validate() {
        let config = PipelineConfig {
            max_answers: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(BestTileError::Config(_))));

        let config = PipelineConfig {
            server: "  ".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
