//! Atomic publication error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PublishError {
    #[error("refusing to operate on dangerous destination: {path}")]
    DangerousDestination { path: String },

    #[error("staging failed for {target}: {message}")]
    StagingFailed { target: String, message: String },

    #[error("rename failed for {target}: {message}")]
    RenameFailed { target: String, message: String },

    #[error("published file failed verification: {path} - {message}")]
    VerifyFailed { path: String, message: String },
}

impl UserFacingError for PublishError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DangerousDestination { .. } => {
                Some("Use a project-local output directory, not a system or home directory.")
            }
            Self::StagingFailed { .. } | Self::RenameFailed { .. } => {
                Some("Check free space and permissions on the output directory.")
            }
            Self::VerifyFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::StagingFailed { .. } | Self::RenameFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DangerousDestination { .. } => "publish.dangerous_destination",
            Self::StagingFailed { .. } => "publish.staging_failed",
            Self::RenameFailed { .. } => "publish.rename_failed",
            Self::VerifyFailed { .. } => "publish.verify_failed",
        };
        Some(code)
    }
}
