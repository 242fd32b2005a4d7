//! Error types for repovars-core.
//!
//! Errors are split by the scope they are fatal to:
//! - [`PreconditionError`] stops the whole run before any remote call.
//! - [`ReferenceError`] stops a single repository.
//! - [`RemoteError`] is reported against the entity whose call produced it.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent a run from starting.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// No token was supplied explicitly or through the environment.
    #[error("no GitHub token provided (pass --token or set GITHUB_TOKEN)")]
    MissingCredential,

    /// The configuration document does not exist or cannot be read.
    #[error("configuration not found at {path}: {reason}")]
    MissingConfig { path: PathBuf, reason: String },

    /// The configuration document exists but is not a valid desired state.
    #[error("malformed configuration: {message}")]
    MalformedConfig { message: String },
}

impl PreconditionError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        PreconditionError::MalformedConfig {
            message: message.into(),
        }
    }
}

/// A repository reference that cannot be split into owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("malformed repository reference '{reference}': expected 'owner/name'")]
    MalformedReference { reference: String },
}

/// Errors returned by a [`crate::remote::RemoteClient`].
///
/// "Resource absent" on a read is not an error: it is reported as
/// [`crate::remote::Lookup::NotFound`]. Everything here is terminal for the
/// entity being reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// 401: the token was rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// 403 without rate-limit exhaustion.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// 429, or 403 with the rate-limit budget exhausted.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// 422: the remote refused the payload (invalid name, bad policy, ...).
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// 5xx.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status, including a 404 on a mutation.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result alias for remote client operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
