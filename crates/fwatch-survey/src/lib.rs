//! # fwatch-survey
//!
//! Client and data model for the crowdsourcing task server.
//!
//! The server hands out tasks (a geographic cell each) to volunteers and
//! stores one task run per answer. This crate lists an application's tasks
//! and downloads the answers for each of them.
//!
//! ## Example
//!
//! ```no_run
//! use fwatch_survey::{SurveyClient, TaskQuery};
//!
//! let client = SurveyClient::new("http://forestwatchers.net/pybossa", None)?;
//! let app_id = client.app_id("besttile")?;
//! let tasks = client.tasks(app_id, TaskQuery { completed_only: true, limit: 1056 })?;
//! let answers = client.answers_for(&tasks, 30, "besttile")?;
//! println!("{} tasks, {} answer lists", tasks.len(), answers.len());
//! # Ok::<(), fwatch_survey::SurveyError>(())
//! ```

mod answer;
mod client;
mod error;
mod task;

pub use answer::{Answer, Feature, Geometry, VoteRecord, NO_DEFORESTATION};
pub use client::{SurveyClient, TaskQuery};
pub use error::SurveyError;
pub use task::{Extent, Task};

/// Result type for survey operations.
pub type Result<T> = std::result::Result<T, SurveyError>;
