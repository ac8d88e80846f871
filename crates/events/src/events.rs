//! Domain event definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wheelwright_errors::UserFacingError;
use wheelwright_types::BuildPhase;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, if the error carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(str::to_string),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(str::to_string),
            retryable: error.is_retryable(),
        }
    }
}

/// Log severity of an event, used for tracing mirroring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Build-pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// Build request accepted
    Started {
        source_id: String,
        isolation: String,
    },

    /// Pipeline phase opened
    PhaseStarted { phase: BuildPhase },

    /// Pipeline phase closed
    PhaseCompleted {
        phase: BuildPhase,
        duration_ms: u64,
        success: bool,
    },

    /// Environment selector resolved a pinned environment
    EnvironmentSelected { reference: String },

    /// Isolation context provisioned
    ContextProvisioned {
        context_id: String,
        backend: String,
    },

    /// Backend build command launched inside the context
    CommandStarted { command: String },

    /// Backend build command finished
    CommandCompleted { exit_code: i32 },

    /// Candidate artifact discovered in the staging directory
    ArtifactDiscovered { file_name: String },

    /// Validated artifact atomically published
    ArtifactPublished { file_name: String, digest: String },

    /// Isolation context torn down
    ContextTornDown { context_id: String },

    /// Build request finished
    Completed {
        success: bool,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        failure: Option<FailureContext>,
    },
}

/// General diagnostics not tied to a pipeline phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    DebugLog {
        message: String,
        context: HashMap<String, String>,
    },
    Warning {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl GeneralEvent {
    #[must_use]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::DebugLog {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn debug_with_context(
        message: impl Into<String>,
        context: HashMap<String, String>,
    ) -> Self {
        Self::DebugLog {
            message: message.into(),
            context,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

/// Top-level event type carried on the channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum AppEvent {
    Build(BuildEvent),
    General(GeneralEvent),
}

impl AppEvent {
    /// Severity used when mirroring the event into tracing
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::General(GeneralEvent::DebugLog { .. }) => EventLevel::Debug,
            Self::General(GeneralEvent::Warning { .. }) => EventLevel::Warning,
            Self::General(GeneralEvent::Error { .. }) => EventLevel::Error,
            Self::Build(
                BuildEvent::CommandStarted { .. }
                | BuildEvent::CommandCompleted { .. }
                | BuildEvent::ArtifactDiscovered { .. },
            ) => EventLevel::Debug,
            Self::Build(BuildEvent::Completed { success: false, .. }) => EventLevel::Warning,
            Self::Build(_) => EventLevel::Info,
        }
    }
}
