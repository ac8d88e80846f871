//! Isolation layer error types

use std::borrow::Cow;

use crate::{ErrorCode, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum IsolationError {
    #[error("unsupported environment: {requested}. Available: {available}")]
    UnsupportedEnvironment { requested: String, available: String },

    #[error("unsupported runtime version: {version}. Supported versions: {supported}")]
    UnsupportedRuntime { version: String, supported: String },

    #[error("isolation runtime unavailable: {message}")]
    RuntimeUnavailable { message: String },

    #[error("provisioning failed: {message}")]
    ProvisionFailed { message: String },

    #[error("execution failed before the build command could run: {message}")]
    ExecutionFailed { message: String },

    #[error("teardown failed for context {context_id}: {message}")]
    TeardownFailed { context_id: String, message: String },
}

impl IsolationError {
    #[must_use]
    pub fn build_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedEnvironment { .. } | Self::UnsupportedRuntime { .. } => {
                ErrorCode::UnsupportedEnvironment
            }
            Self::RuntimeUnavailable { .. }
            | Self::ProvisionFailed { .. }
            | Self::ExecutionFailed { .. }
            | Self::TeardownFailed { .. } => ErrorCode::IsolationFailed,
        }
    }
}

impl UserFacingError for IsolationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedEnvironment { .. } => {
                Some("Pick one of the listed platform/architecture keys.")
            }
            Self::UnsupportedRuntime { .. } => {
                Some("Pick one of the listed runtime versions.")
            }
            Self::RuntimeUnavailable { .. } => {
                Some("Install Docker or ensure the daemon is running, or switch to venv isolation.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProvisionFailed { .. } | Self::TeardownFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnsupportedEnvironment { .. } => "isolation.unsupported_environment",
            Self::UnsupportedRuntime { .. } => "isolation.unsupported_runtime",
            Self::RuntimeUnavailable { .. } => "isolation.runtime_unavailable",
            Self::ProvisionFailed { .. } => "isolation.provision_failed",
            Self::ExecutionFailed { .. } => "isolation.execution_failed",
            Self::TeardownFailed { .. } => "isolation.teardown_failed",
        };
        Some(code)
    }
}
