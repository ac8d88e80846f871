//! Resolved environment specifications

use crate::images;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use wheelwright_errors::{IsolationError, Result};

/// Fully resolved execution environment identifier.
///
/// Always concrete: a pinned image reference plus its in-container
/// interpreter, or an absolute host interpreter path. No partial or
/// symbolic references reach the isolation backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EnvironmentId {
    Image {
        reference: String,
        interpreter: String,
    },
    Interpreter {
        path: PathBuf,
    },
}

/// A resolved environment and the request facts it satisfies.
///
/// Only the selector constructs these; for a fixed input the result is
/// byte-identical across runs and machines (image case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    id: EnvironmentId,
    runtime_version: String,
    platform: String,
    arch: String,
}

impl EnvironmentSpec {
    pub(crate) fn new(
        id: EnvironmentId,
        runtime_version: String,
        platform: String,
        arch: String,
    ) -> Self {
        Self {
            id,
            runtime_version,
            platform,
            arch,
        }
    }

    #[must_use]
    pub fn id(&self) -> &EnvironmentId {
        &self.id
    }

    /// Short runtime version this environment satisfies (e.g. "3.12")
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Pinned image reference, for containerized environments
    #[must_use]
    pub fn image_reference(&self) -> Option<&str> {
        match &self.id {
            EnvironmentId::Image { reference, .. } => Some(reference),
            EnvironmentId::Interpreter { .. } => None,
        }
    }

    /// Interpreter invoked by the build command, wherever it lives
    #[must_use]
    pub fn interpreter(&self) -> String {
        match &self.id {
            EnvironmentId::Image { interpreter, .. } => interpreter.clone(),
            EnvironmentId::Interpreter { path } => path.display().to_string(),
        }
    }
}

/// Resolve a containerized environment from the static tables.
///
/// # Errors
///
/// Fails with `UnsupportedEnvironment` for unknown platform/arch keys or
/// overrides, and `UnsupportedRuntime` for versions outside the supported
/// set.
pub fn select_image_environment(
    runtime_version: &str,
    platform: &str,
    arch: &str,
    explicit_override: Option<&str>,
) -> Result<EnvironmentSpec> {
    images::validate_runtime_version(runtime_version)?;
    let reference = images::resolve_image(platform, arch, explicit_override)?;
    let interpreter = images::container_interpreter(runtime_version)?;

    Ok(EnvironmentSpec::new(
        EnvironmentId::Image {
            reference: reference.to_string(),
            interpreter: interpreter.to_string(),
        },
        images::short_version(runtime_version.trim()),
        if platform.is_empty() || platform == "auto" {
            images::DEFAULT_PLATFORM.to_string()
        } else {
            platform.to_string()
        },
        images::canonical_arch(arch).to_string(),
    ))
}

/// Resolve a host-interpreter environment for the venv backend.
///
/// The version is validated against the supported set first, then the
/// matching `pythonX.Y` binary is located on the host. The resulting spec
/// carries an absolute path.
///
/// # Errors
///
/// Fails with `UnsupportedRuntime` for versions outside the supported set
/// and `RuntimeUnavailable` when no matching interpreter is installed.
pub fn select_host_environment(runtime_version: &str, arch: &str) -> Result<EnvironmentSpec> {
    images::validate_runtime_version(runtime_version)?;
    let short = images::short_version(runtime_version.trim());

    let binary = format!("python{short}");
    let path = which::which(&binary).map_err(|_| IsolationError::RuntimeUnavailable {
        message: format!("no {binary} interpreter found on PATH"),
    })?;

    Ok(EnvironmentSpec::new(
        EnvironmentId::Interpreter { path },
        short,
        "host".to_string(),
        images::canonical_arch(arch).to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_spec_is_fully_resolved() {
        let spec = select_image_environment("3.12.1", "manylinux", "amd64", None).unwrap();
        assert_eq!(
            spec.image_reference(),
            Some("quay.io/pypa/manylinux_2_28_x86_64")
        );
        assert_eq!(spec.interpreter(), "/opt/python/cp312-cp312/bin/python");
        assert_eq!(spec.runtime_version(), "3.12");
        assert_eq!(spec.arch(), "x86_64");
    }

    #[test]
    fn image_spec_determinism() {
        let a = select_image_environment("3.10", "musllinux", "x86_64", None).unwrap();
        let b = select_image_environment("3.10", "musllinux", "x86_64", None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unsupported_version_fails_before_lookup() {
        let err = select_image_environment("3.8", "manylinux", "x86_64", None).unwrap_err();
        assert!(err.to_string().contains("3.9"));
    }
}
