//! Isolation backend capability interface
//!
//! Both backends sit behind one trait: provision a context, execute the
//! build command inside it, tear the context down. A non-zero exit from
//! `execute` is returned as data; only failures of the isolation layer
//! itself are errors.

use crate::spec::EnvironmentSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;
use wheelwright_errors::Result;

/// Process-wide count of live isolation contexts.
///
/// Operational visibility only; correctness never depends on it.
static ACTIVE_CONTEXTS: AtomicUsize = AtomicUsize::new(0);

/// Number of currently provisioned, not yet torn down contexts
#[must_use]
pub fn active_contexts() -> usize {
    ACTIVE_CONTEXTS.load(Ordering::SeqCst)
}

/// Serializes tests that assert on the process-wide context counter.
#[cfg(test)]
pub(crate) static CONTEXT_COUNTER_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// A host path made visible inside the isolation context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    pub source: PathBuf,
    pub target: PathBuf,
    pub writable: bool,
}

impl MountSpec {
    /// Read-only mount
    #[must_use]
    pub fn ro(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            writable: false,
        }
    }

    /// Read-write mount
    #[must_use]
    pub fn rw(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            writable: true,
        }
    }
}

/// Resource ceilings applied when the build command runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory ceiling (e.g. "4g"), containerized builds only
    pub memory: Option<String>,
    /// CPU share (e.g. 2.0), containerized builds only
    pub cpus: Option<f64>,
    /// Whether the build may reach the network
    pub network: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory: None,
            cpus: None,
            network: true,
        }
    }
}

/// The backend build invocation, in structured form.
///
/// Backends render this into argv vectors or a generated script; request
/// fields are never interpolated into a shell string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCommand {
    pub build_wheel: bool,
    pub build_sdist: bool,
    /// Requirements installed before the backend runs
    pub build_requirements: Vec<String>,
    /// Backend config settings, ordered for reproducible rendering
    pub config_settings: BTreeMap<String, String>,
    /// Repair platform tags after the build (containerized builds)
    pub repair_wheel: bool,
}

impl BuildCommand {
    #[must_use]
    pub fn new(build_wheel: bool, build_sdist: bool) -> Self {
        Self {
            build_wheel,
            build_sdist,
            build_requirements: Vec::new(),
            config_settings: BTreeMap::new(),
            repair_wheel: false,
        }
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: Vec<String>) -> Self {
        self.build_requirements = requirements;
        self
    }

    #[must_use]
    pub fn with_config_settings(mut self, settings: &HashMap<String, String>) -> Self {
        self.config_settings = settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self
    }

    #[must_use]
    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair_wheel = repair;
        self
    }

    /// `python -m build` arguments shared by both backends
    #[must_use]
    pub fn build_args(&self, outdir: &str) -> Vec<String> {
        let mut args = vec!["-m".to_string(), "build".to_string()];
        if self.build_wheel && !self.build_sdist {
            args.push("--wheel".to_string());
        } else if self.build_sdist && !self.build_wheel {
            args.push("--sdist".to_string());
        }
        for (key, value) in &self.config_settings {
            args.push(format!("--config-setting={key}={value}"));
        }
        args.push("--outdir".to_string());
        args.push(outdir.to_string());
        args
    }
}

/// Captured output of the build command
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A live, provisioned execution environment owned by one in-flight build.
///
/// Created by a backend's `provision`, used for exactly one build command,
/// destroyed on every exit path.
#[derive(Debug)]
pub struct IsolationContext {
    id: Uuid,
    backend: &'static str,
    spec: EnvironmentSpec,
    /// Root scratch directory owned by this context
    work_dir: PathBuf,
    /// Where the backend deposits candidate artifacts
    staging_dir: PathBuf,
    /// Merged environment variables for the build command
    env_vars: HashMap<String, String>,
    mounts: Vec<MountSpec>,
    torn_down: AtomicBool,
}

impl IsolationContext {
    /// Construct a live context. Called by backend implementations only;
    /// every construction registers with the active-context counter.
    #[must_use]
    pub fn new(
        backend: &'static str,
        spec: EnvironmentSpec,
        work_dir: PathBuf,
        staging_dir: PathBuf,
        env_vars: HashMap<String, String>,
        mounts: Vec<MountSpec>,
    ) -> Self {
        ACTIVE_CONTEXTS.fetch_add(1, Ordering::SeqCst);
        Self {
            id: Uuid::new_v4(),
            backend,
            spec,
            work_dir,
            staging_dir,
            env_vars,
            mounts,
            torn_down: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    #[must_use]
    pub fn spec(&self) -> &EnvironmentSpec {
        &self.spec
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    #[must_use]
    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }

    #[must_use]
    pub fn mounts(&self) -> &[MountSpec] {
        &self.mounts
    }

    /// Flip the torn-down flag; true only for the first caller.
    ///
    /// Backends call this at the top of `teardown` to stay idempotent and
    /// keep the active-context counter accurate.
    pub fn mark_torn_down(&self) -> bool {
        let first = !self.torn_down.swap(true, Ordering::SeqCst);
        if first {
            ACTIVE_CONTEXTS.fetch_sub(1, Ordering::SeqCst);
        }
        first
    }
}

/// Capability interface implemented by both isolation variants
#[async_trait]
pub trait IsolationBackend: Send + Sync {
    /// Backend name ("venv" or "container")
    fn name(&self) -> &'static str;

    /// Whether this backend can run on the current host
    async fn available(&self) -> bool;

    /// Provision an isolated execution context for one build.
    ///
    /// # Errors
    ///
    /// Returns an isolation-layer error when the runtime is unreachable or
    /// no writable scratch space exists.
    async fn provision(
        &self,
        spec: &EnvironmentSpec,
        mounts: &[MountSpec],
        env_vars: &HashMap<String, String>,
    ) -> Result<IsolationContext>;

    /// Run the build command inside the context.
    ///
    /// A non-zero exit is not an error; it is returned in the output for
    /// the caller to classify.
    ///
    /// # Errors
    ///
    /// Returns an error only when the command could not be launched at all.
    async fn execute(
        &self,
        ctx: &IsolationContext,
        command: &BuildCommand,
        limits: &ResourceLimits,
    ) -> Result<ExecutionOutput>;

    /// Destroy the context. Idempotent; safe after partial provisioning
    /// and after a forced termination.
    ///
    /// # Errors
    ///
    /// Returns an error when cleanup itself fails; callers log this and
    /// never let it mask a primary failure.
    async fn teardown(&self, ctx: &IsolationContext) -> Result<()>;
}
