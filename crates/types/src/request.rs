//! Build request and metadata collaborator types

use crate::IsolationMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// An additional host path made visible inside the isolation context.
///
/// Read-only unless explicitly marked writable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtraMount {
    pub source: PathBuf,
    pub target: PathBuf,
    pub writable: bool,
}

/// A single build request, immutable once constructed.
///
/// The source tree is already materialized by the external source resolver;
/// `source_id` carries its content identifier (commit hash or tarball
/// digest) for provenance in the final result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Resolved, read-only-safe source tree
    pub source_dir: PathBuf,
    /// Content identifier of the source tree
    pub source_id: String,
    /// Target runtime version (e.g. "3.12")
    pub runtime_version: String,
    /// Target platform family ("manylinux", "musllinux", or "auto")
    pub platform: String,
    /// Target CPU architecture (e.g. "x86_64", "aarch64")
    pub arch: String,
    /// Isolation strategy
    pub isolation: IsolationMode,
    /// Destination directory for published artifacts
    pub output_dir: PathBuf,
    /// Build a wheel
    pub build_wheel: bool,
    /// Build a source distribution
    pub build_sdist: bool,
    /// Explicit environment override (table key or pinned image reference)
    pub image_override: Option<String>,
    /// Opaque settings passed through to the build backend
    pub config_settings: HashMap<String, String>,
    /// Requirements installed before the backend is invoked
    pub build_requirements: Vec<String>,
    /// Extra environment variables for the isolated build
    pub extra_env: HashMap<String, String>,
    /// Additional volumes mounted into the isolation context
    pub extra_mounts: Vec<ExtraMount>,
    /// Repair platform tags after the build (auditwheel)
    pub repair_wheel: bool,
    /// Allow network access inside the isolation context
    pub network: bool,
    /// Memory ceiling for containerized builds (e.g. "4g")
    pub memory_limit: Option<String>,
    /// CPU share for containerized builds (e.g. 2.0)
    pub cpu_limit: Option<f64>,
    /// Timeout for the Execute phase, in seconds
    pub timeout_seconds: Option<u64>,
}

impl BuildRequest {
    /// Create a new request with defaults matching a plain wheel build.
    #[must_use]
    pub fn new(
        source_dir: impl Into<PathBuf>,
        source_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            source_id: source_id.into(),
            runtime_version: "3.12".to_string(),
            platform: "auto".to_string(),
            arch: "x86_64".to_string(),
            isolation: IsolationMode::Auto,
            output_dir: output_dir.into(),
            build_wheel: true,
            build_sdist: false,
            image_override: None,
            config_settings: HashMap::new(),
            build_requirements: Vec::new(),
            extra_env: HashMap::new(),
            extra_mounts: Vec::new(),
            repair_wheel: true,
            network: true,
            memory_limit: None,
            cpu_limit: None,
            timeout_seconds: None,
        }
    }

    /// Set the target runtime version
    #[must_use]
    pub fn with_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = version.into();
        self
    }

    /// Set the target platform family
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the target architecture
    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Set the isolation strategy
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationMode) -> Self {
        self.isolation = isolation;
        self
    }

    /// Select which products to build
    #[must_use]
    pub fn with_products(mut self, wheel: bool, sdist: bool) -> Self {
        self.build_wheel = wheel;
        self.build_sdist = sdist;
        self
    }

    /// Set an explicit environment override
    #[must_use]
    pub fn with_image_override(mut self, image: impl Into<String>) -> Self {
        self.image_override = Some(image.into());
        self
    }

    /// Set backend config settings
    #[must_use]
    pub fn with_config_settings(mut self, settings: HashMap<String, String>) -> Self {
        self.config_settings = settings;
        self
    }

    /// Set build requirements
    #[must_use]
    pub fn with_build_requirements(mut self, requirements: Vec<String>) -> Self {
        self.build_requirements = requirements;
        self
    }

    /// Add an extra mount
    #[must_use]
    pub fn with_extra_mount(
        mut self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        writable: bool,
    ) -> Self {
        self.extra_mounts.push(ExtraMount {
            source: source.into(),
            target: target.into(),
            writable,
        });
        self
    }

    /// Set the Execute-phase timeout
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Disable network access inside the isolation context
    #[must_use]
    pub fn without_network(mut self) -> Self {
        self.network = false;
        self
    }

    /// Set resource limits for containerized builds
    #[must_use]
    pub fn with_resource_limits(
        mut self,
        memory_limit: Option<String>,
        cpu_limit: Option<f64>,
    ) -> Self {
        self.memory_limit = memory_limit;
        self.cpu_limit = cpu_limit;
        self
    }
}

/// Project facts supplied by the external metadata collaborator.
///
/// Extraction from manifests is out of scope here; the executor only
/// consumes the result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Distribution name
    pub name: String,
    /// Declared version, if the manifest pins one
    pub version: Option<String>,
    /// Declared runtime-version constraint (e.g. ">=3.9")
    pub requires_python: Option<String>,
    /// Build-system requirements from the manifest
    pub build_requirements: Vec<String>,
    /// Backend configuration settings from the manifest
    pub backend_settings: HashMap<String, String>,
}
