//! CLI error types.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that stop the CLI before a response can be printed.
///
/// Failed fetches are not errors here: they come back as a
/// `CalendarResponse` with `Error` set.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A secret reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(String),

    /// The upstream client could not be built.
    #[error("upstream error: {0}")]
    Upstream(#[from] calscrape_upstream::FetchError),

    /// Tracing could not be initialized.
    #[error("tracing error: {0}")]
    Tracing(#[from] calscrape_core::TracingError),

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
