//! Stable error classification for build results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal classification of a failed build request.
///
/// Exactly one code is recorded on a failed `BuildResult`. There is no
/// automatic retry inside the core; retry policy belongs to calling layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Requested platform/arch/runtime has no entry in the environment table
    UnsupportedEnvironment,
    /// Metadata collection or environment resolution failed
    AnalyzeFailed,
    /// The isolation layer could not provision or tear down a context
    IsolationFailed,
    /// The build command exceeded the caller-supplied timeout
    BuildTimeout,
    /// The build backend exited non-zero
    BackendFailed,
    /// A mount path escaped the permitted roots
    UnsafePath,
    /// An archive entry was absolute or contained a traversal segment
    UnsafeArchive,
    /// A required structural metadata entry was absent from an archive
    MissingRequiredMetadata,
    /// Artifact validation failed for another reason
    ValidationFailed,
    /// Atomic publication into the destination directory failed
    PublishFailed,
}

impl ErrorCode {
    /// Stable snake_case identifier, suitable for logs and structured output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedEnvironment => "unsupported_environment",
            Self::AnalyzeFailed => "analyze_failed",
            Self::IsolationFailed => "isolation_failed",
            Self::BuildTimeout => "build_timeout",
            Self::BackendFailed => "backend_failed",
            Self::UnsafePath => "unsafe_path",
            Self::UnsafeArchive => "unsafe_archive",
            Self::MissingRequiredMetadata => "missing_required_metadata",
            Self::ValidationFailed => "validation_failed",
            Self::PublishFailed => "publish_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorCode::UnsafeArchive).unwrap();
        assert_eq!(json, "\"unsafe_archive\"");
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(
            ErrorCode::MissingRequiredMetadata.to_string(),
            "missing_required_metadata"
        );
    }
}
