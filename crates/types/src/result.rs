//! Artifacts and the final build result

use crate::phase::PhaseRecord;
use crate::wheel::WheelInfo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wheelwright_errors::ErrorCode;

/// Kind of build product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Wheel,
    Sdist,
}

impl ArtifactKind {
    /// Classify a candidate output file by its name, if it is a build product.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".whl") {
            Some(Self::Wheel)
        } else if name.ends_with(".tar.gz") {
            Some(Self::Sdist)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wheel => write!(f, "wheel"),
            Self::Sdist => write!(f, "sdist"),
        }
    }
}

/// A candidate output file discovered after the backend build command
/// completes, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl Artifact {
    #[must_use]
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// File name of the candidate
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A validated, atomically published artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub kind: ArtifactKind,
    /// Final path inside the destination directory
    pub path: PathBuf,
    /// BLAKE3 digest of the published bytes, hex encoded
    pub digest: String,
    /// Size of the published file in bytes
    pub size: u64,
}

/// Outcome of one build request, produced exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub success: bool,
    /// Published artifacts (empty on failure)
    pub artifacts: Vec<PublishedArtifact>,
    /// Terminal classification, present only on failure
    pub error_code: Option<ErrorCode>,
    /// Human-readable summary naming the phase and offending input on failure
    pub message: String,
    /// Linear phase sequence, truncated at the failing phase
    pub phases: Vec<PhaseRecord>,
    /// Provenance identifier of the source tree
    pub source_id: String,
    /// Metadata parsed from the published wheel's filename, if one was built
    pub wheel_info: Option<WheelInfo>,
}

impl BuildResult {
    /// Construct a successful result.
    #[must_use]
    pub fn succeeded(
        artifacts: Vec<PublishedArtifact>,
        phases: Vec<PhaseRecord>,
        source_id: String,
        wheel_info: Option<WheelInfo>,
    ) -> Self {
        let message = match artifacts.len() {
            1 => format!("published {}", artifacts[0].path.display()),
            n => format!("published {n} artifacts"),
        };
        Self {
            success: true,
            artifacts,
            error_code: None,
            message,
            phases,
            source_id,
            wheel_info,
        }
    }

    /// Construct a failed result.
    #[must_use]
    pub fn failed(
        code: ErrorCode,
        message: impl Into<String>,
        phases: Vec<PhaseRecord>,
        source_id: String,
    ) -> Self {
        Self {
            success: false,
            artifacts: Vec::new(),
            error_code: Some(code),
            message: message.into(),
            phases,
            source_id,
            wheel_info: None,
        }
    }

    /// Path of the published wheel, if any
    #[must_use]
    pub fn wheel_path(&self) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::Wheel)
            .map(|a| a.path.as_path())
    }

    /// Path of the published sdist, if any
    #[must_use]
    pub fn sdist_path(&self) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::Sdist)
            .map(|a| a.path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_candidate_files() {
        assert_eq!(
            ArtifactKind::from_path(Path::new("dist/pkg-1.0-py3-none-any.whl")),
            Some(ArtifactKind::Wheel)
        );
        assert_eq!(
            ArtifactKind::from_path(Path::new("dist/pkg-1.0.tar.gz")),
            Some(ArtifactKind::Sdist)
        );
        assert_eq!(ArtifactKind::from_path(Path::new("dist/build.log")), None);
    }

    #[test]
    fn failed_result_carries_code_and_phases() {
        let result = BuildResult::failed(
            ErrorCode::UnsafeArchive,
            "unsafe entry in pkg.whl: /etc/passwd",
            Vec::new(),
            "sha256:abc".into(),
        );
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ErrorCode::UnsafeArchive));
        assert!(result.message.contains("/etc/passwd"));
    }
}
