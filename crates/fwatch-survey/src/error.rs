//! Error types for the survey client.

use thiserror::Error;

/// Errors that can occur when talking to the task server.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// HTTP transport error (connection refused, DNS failure, timeout, ...).
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Request to {url} failed: HTTP {status}")]
    Status {
        /// Requested URL, including query string.
        url: String,
        /// Status code returned.
        status: u16,
    },

    /// A payload did not have the expected JSON shape.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// No application with the given short name.
    #[error("No application named '{0}' on the server")]
    UnknownApp(String),
}
