//! # fwatch-besttile
//!
//! Best-tile selection and compositing for the forest-monitoring survey.
//!
//! Volunteers pick, for each task's cell, which of twelve dated acquisitions
//! shows the ground best. This crate tallies those votes, crops the winning
//! acquisition for each task, encodes how strongly the crowd agreed, and
//! merges everything into mosaics.
//!
//! ## Example
//!
//! ```no_run
//! use fwatch_besttile::{run_best_tile, PipelineConfig};
//! use fwatch_raster::GdalTools;
//! use fwatch_survey::SurveyClient;
//!
//! let config = PipelineConfig::default();
//! let client = SurveyClient::new(&config.server, config.http_timeout())?;
//! let tools = GdalTools::new(&config.gdal_translate, &config.gdal_merge);
//!
//! for report in run_best_tile(&config, &client, &tools)? {
//!     println!("{:?} n={} -> {:?}", report.scope, report.min_answers, report.status);
//! }
//! # Ok::<(), fwatch_besttile::BestTileError>(())
//! ```

pub mod category;
pub mod confidence;
pub mod config;
mod error;
pub mod output;
pub mod pipeline;
pub mod tally;

pub use category::{Category, CATEGORY_COUNT, CATEGORY_LABELS};
pub use confidence::AgreementBand;
pub use config::PipelineConfig;
pub use error::BestTileError;
pub use output::{Product, Scope};
pub use pipeline::{run_best_tile, BestTileRunner, ProductReport, RunReport, RunStatus};
pub use tally::{tally_tasks, Selection, Tally};

/// Result type for best-tile operations.
pub type Result<T> = std::result::Result<T, BestTileError>;
