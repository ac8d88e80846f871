#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the wheelwright build system
//!
//! This crate provides the data model shared across the pipeline: build
//! requests, phase records, artifacts, and build results.

pub mod phase;
pub mod request;
pub mod result;
pub mod wheel;

// Re-export commonly used types
pub use phase::{BuildPhase, PhaseLog, PhaseOutcome, PhaseRecord};
pub use request::{BuildRequest, ExtraMount, ProjectMetadata};
pub use result::{Artifact, ArtifactKind, BuildResult, PublishedArtifact};
pub use wheel::WheelInfo;

use serde::{Deserialize, Serialize};

/// Isolation strategy requested for a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Throwaway virtual environment on the host interpreter
    Venv,
    /// Containerized build from a pinned manylinux/musllinux image
    Container,
    /// Container when a runtime is reachable, venv otherwise
    Auto,
}

impl std::fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Venv => write!(f, "venv"),
            Self::Container => write!(f, "container"),
            Self::Auto => write!(f, "auto"),
        }
    }
}
