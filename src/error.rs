use camino::Utf8PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::Source;

#[derive(Debug, Error, Diagnostic)]
pub enum RecallError {
    #[error("invalid limit: {0}")]
    #[diagnostic(help("limit must be a positive integer"))]
    InvalidLimit(String),

    #[error("search query is required")]
    EmptyQuery,

    #[error("invalid source: {0}")]
    #[diagnostic(help("expected `fda`, `cpsc`, or nothing for both"))]
    InvalidSource(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("{upstream} request failed: {message}")]
    UpstreamHttp { upstream: Source, message: String },

    #[error("{upstream} returned status {status}: {message}")]
    UpstreamStatus {
        upstream: Source,
        status: u16,
        message: String,
    },

    #[error("{upstream} returned a malformed payload: {message}")]
    UpstreamPayload { upstream: Source, message: String },
}

impl RecallError {
    /// Errors caused by caller-supplied request parameters.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            RecallError::InvalidLimit(_) | RecallError::EmptyQuery | RecallError::InvalidSource(_)
        )
    }
}
