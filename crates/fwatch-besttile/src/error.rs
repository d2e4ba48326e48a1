//! Error types for the best-tile pipeline.

use thiserror::Error;

/// Errors that abort a best-tile run.
#[derive(Debug, Error)]
pub enum BestTileError {
    /// I/O error on the working or destination directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetching tasks or answers failed.
    #[error("Survey error: {0}")]
    Survey(#[from] fwatch_survey::SurveyError),

    /// Reading or rewriting a cropped tile failed.
    #[error("Raster error: {0}")]
    Raster(#[from] fwatch_raster::RasterError),

    /// Configuration file could not be parsed.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tasks and tallies do not line up.
    #[error("{tasks} tasks but {tallies} tallies")]
    TallyMismatch {
        /// Number of tasks.
        tasks: usize,
        /// Number of tallies.
        tallies: usize,
    },
}
