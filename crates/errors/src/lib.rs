#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the wheelwright build system
//!
//! This crate provides fine-grained error types organized by domain, plus
//! the stable `ErrorCode` classification surfaced on build results.
//! All error types implement Clone for easier handling.

use std::borrow::Cow;

use thiserror::Error;

pub mod build;
pub mod code;
pub mod isolation;
pub mod publish;
pub mod validation;

// Re-export all error types at the root
pub use build::BuildError;
pub use code::ErrorCode;
pub use isolation::IsolationError;
pub use publish::PublishError;
pub use validation::ValidationError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("isolation error: {0}")]
    Isolation(#[from] IsolationError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Classify this error into the stable code recorded on build results.
    #[must_use]
    pub fn build_code(&self) -> ErrorCode {
        match self {
            Self::Isolation(err) => err.build_code(),
            Self::Build(err) => err.build_code(),
            Self::Validation(err) => err.build_code(),
            Self::Publish(_) => ErrorCode::PublishFailed,
            Self::Cancelled => ErrorCode::BuildTimeout,
            Self::Internal(_) | Self::Io { .. } => ErrorCode::IsolationFailed,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

/// Result type alias for wheelwright operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Isolation(err) => err.user_message(),
            Error::Build(err) => err.user_message(),
            Error::Validation(err) => err.user_message(),
            Error::Publish(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Isolation(err) => err.user_hint(),
            Error::Build(err) => err.user_hint(),
            Error::Validation(err) => err.user_hint(),
            Error::Publish(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Isolation(err) => err.is_retryable(),
            Error::Build(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Isolation(err) => err.user_code(),
            Error::Build(err) => err.user_code(),
            Error::Validation(err) => err.user_code(),
            Error::Publish(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
