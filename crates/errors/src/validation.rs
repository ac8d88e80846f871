//! Safety validation error types

use std::borrow::Cow;

use crate::{ErrorCode, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("unsafe path: {path} - {reason}")]
    UnsafePath { path: String, reason: String },

    #[error("unsafe entry in {archive}: {entry} - {reason}")]
    UnsafeArchiveEntry {
        archive: String,
        entry: String,
        reason: String,
    },

    #[error("{archive} is missing required metadata entry: {entry}")]
    MissingRequiredMetadata { archive: String, entry: String },

    #[error("cannot read archive {archive}: {message}")]
    UnreadableArchive { archive: String, message: String },
}

impl ValidationError {
    #[must_use]
    pub fn build_code(&self) -> ErrorCode {
        match self {
            Self::UnsafePath { .. } => ErrorCode::UnsafePath,
            Self::UnsafeArchiveEntry { .. } => ErrorCode::UnsafeArchive,
            Self::MissingRequiredMetadata { .. } => ErrorCode::MissingRequiredMetadata,
            Self::UnreadableArchive { .. } => ErrorCode::ValidationFailed,
        }
    }
}

impl UserFacingError for ValidationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsafeArchiveEntry { .. } => Some(
                "The named entry points outside the extraction root; inspect the packaging step that produced it.",
            ),
            Self::MissingRequiredMetadata { .. } => {
                Some("The build backend produced a structurally incomplete archive.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnsafePath { .. } => "validation.unsafe_path",
            Self::UnsafeArchiveEntry { .. } => "validation.unsafe_archive_entry",
            Self::MissingRequiredMetadata { .. } => "validation.missing_required_metadata",
            Self::UnreadableArchive { .. } => "validation.unreadable_archive",
        };
        Some(code)
    }
}
