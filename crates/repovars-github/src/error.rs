//! Error types for repovars-github

use thiserror::Error;

/// Errors raised while setting up the GitHub client.
///
/// Request failures are reported as [`repovars_core::RemoteError`] so the
/// reconciler can handle them per entity.
#[derive(Error, Debug)]
pub enum GithubError {
    /// The API base URL does not parse or cannot carry a path
    #[error("invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },

    /// The token contains characters not allowed in a header
    #[error("token is not a valid header value")]
    InvalidToken,

    /// reqwest refused to build the client
    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::Http(err.to_string())
    }
}

/// Result type for repovars-github setup
pub type Result<T> = std::result::Result<T, GithubError>;
