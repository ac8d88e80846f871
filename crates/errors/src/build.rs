//! Build pipeline error types

use std::borrow::Cow;

use crate::{ErrorCode, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("source tree not found: {path}")]
    SourceMissing { path: String },

    #[error("source tree is empty: {path}")]
    SourceEmpty { path: String },

    #[error("analyze failed: {message}")]
    AnalyzeFailed { message: String },

    #[error("backend build command failed with exit code {exit_code}: {stderr}")]
    BackendFailed { exit_code: i32, stderr: String },

    #[error("build timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("build cancelled")]
    Cancelled,

    #[error("backend produced no artifacts in {dir}")]
    NoArtifactsProduced { dir: String },
}

impl BuildError {
    #[must_use]
    pub fn build_code(&self) -> ErrorCode {
        match self {
            Self::SourceMissing { .. } | Self::SourceEmpty { .. } | Self::AnalyzeFailed { .. } => {
                ErrorCode::AnalyzeFailed
            }
            Self::BackendFailed { .. } | Self::NoArtifactsProduced { .. } => {
                ErrorCode::BackendFailed
            }
            Self::Timeout { .. } | Self::Cancelled => ErrorCode::BuildTimeout,
        }
    }
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SourceMissing { .. } | Self::SourceEmpty { .. } => {
                Some("Point the build at a materialized, non-empty source tree.")
            }
            Self::Timeout { .. } => {
                Some("Increase the build timeout or reduce the work the backend performs.")
            }
            Self::BackendFailed { .. } => {
                Some("Inspect the captured backend stderr for the underlying build failure.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SourceMissing { .. } => "build.source_missing",
            Self::SourceEmpty { .. } => "build.source_empty",
            Self::AnalyzeFailed { .. } => "build.analyze_failed",
            Self::BackendFailed { .. } => "build.backend_failed",
            Self::Timeout { .. } => "build.timeout",
            Self::Cancelled => "build.cancelled",
            Self::NoArtifactsProduced { .. } => "build.no_artifacts_produced",
        };
        Some(code)
    }
}
