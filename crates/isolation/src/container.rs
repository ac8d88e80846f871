//! Containerized isolation
//!
//! No long-lived container is created at provision time; each `execute`
//! launches a fresh instance from the pinned image with the source tree and
//! staging directory bind-mounted. Teardown force-removes the instance, so
//! a timed-out or hung build never leaves an orphaned container behind.

use crate::backend::{
    BuildCommand, ExecutionOutput, IsolationBackend, IsolationContext, MountSpec, ResourceLimits,
};
use crate::script::{
    generate_build_script, CONTAINER_OUTPUT_DIR, CONTAINER_SOURCE_DIR, SCRIPT_NAME,
};
use crate::spec::{EnvironmentId, EnvironmentSpec};
use crate::variables::merge_env;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::process::Command;
use uuid::Uuid;
use wheelwright_errors::{IsolationError, Result};

/// Containerized isolation backend driving the `docker` CLI
#[derive(Debug, Default, Clone)]
pub struct ContainerBackend;

impl ContainerBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn container_name(ctx: &IsolationContext) -> String {
        format!("wheelwright-{}", ctx.id().simple())
    }

    /// Assemble the `docker run` argv from the context and limits.
    ///
    /// Everything here comes from the static environment table or validated
    /// configuration; request fields are never spliced into a shell string.
    fn run_args(
        ctx: &IsolationContext,
        limits: &ResourceLimits,
        image: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            Self::container_name(ctx),
        ];

        if let Some(memory) = &limits.memory {
            args.push("--memory".to_string());
            args.push(memory.clone());
        }
        if let Some(cpus) = limits.cpus {
            args.push("--cpus".to_string());
            args.push(cpus.to_string());
        }
        if !limits.network {
            args.push("--network=none".to_string());
        }

        for mount in ctx.mounts() {
            let mode = if mount.writable { "rw" } else { "ro" };
            args.push("-v".to_string());
            args.push(format!(
                "{}:{}:{mode}",
                mount.source.display(),
                mount.target.display()
            ));
        }
        // Staging directory receives the artifacts and carries the script
        args.push("-v".to_string());
        args.push(format!(
            "{}:{CONTAINER_OUTPUT_DIR}:rw",
            ctx.staging_dir().display()
        ));

        let mut env_keys: Vec<&String> = ctx.env_vars().keys().collect();
        env_keys.sort();
        for key in env_keys {
            args.push("-e".to_string());
            args.push(format!("{key}={}", ctx.env_vars()[key]));
        }

        args.push("-w".to_string());
        args.push(CONTAINER_SOURCE_DIR.to_string());
        args.push(image.to_string());
        args.push("bash".to_string());
        args.push(format!("{CONTAINER_OUTPUT_DIR}/{SCRIPT_NAME}"));

        args
    }
}

#[async_trait]
impl IsolationBackend for ContainerBackend {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn available(&self) -> bool {
        if which::which("docker").is_err() {
            return false;
        }
        Command::new("docker")
            .arg("info")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn provision(
        &self,
        spec: &EnvironmentSpec,
        mounts: &[MountSpec],
        env_vars: &HashMap<String, String>,
    ) -> Result<IsolationContext> {
        let EnvironmentId::Image { .. } = spec.id() else {
            return Err(IsolationError::ProvisionFailed {
                message: "container backend requires an image environment".to_string(),
            }
            .into());
        };

        if !self.available().await {
            return Err(IsolationError::RuntimeUnavailable {
                message:
                    "docker is not available; install Docker or ensure the daemon is running"
                        .to_string(),
            }
            .into());
        }

        // Unique per provision call so concurrent builds never collide
        let work_dir = std::env::temp_dir()
            .join(format!("wheelwright-container-{}", Uuid::new_v4().simple()));
        let staging_dir = work_dir.join("output");
        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| IsolationError::ProvisionFailed {
                message: format!("no writable temp space at {}: {e}", work_dir.display()),
            })?;

        Ok(IsolationContext::new(
            self.name(),
            spec.clone(),
            work_dir,
            staging_dir,
            merge_env(env_vars),
            mounts.to_vec(),
        ))
    }

    async fn execute(
        &self,
        ctx: &IsolationContext,
        command: &BuildCommand,
        limits: &ResourceLimits,
    ) -> Result<ExecutionOutput> {
        let EnvironmentId::Image {
            reference,
            interpreter,
        } = ctx.spec().id()
        else {
            return Err(IsolationError::ExecutionFailed {
                message: "context was not provisioned from an image environment".to_string(),
            }
            .into());
        };

        // Script lands in the staging mount so the steps are replayable
        let script = generate_build_script(interpreter, command);
        let script_path = ctx.staging_dir().join(SCRIPT_NAME);
        tokio::fs::write(&script_path, &script)
            .await
            .map_err(|e| IsolationError::ExecutionFailed {
                message: format!("cannot write build script: {e}"),
            })?;
        set_executable(&script_path).await?;

        let args = Self::run_args(ctx, limits, reference);
        let output = Command::new("docker")
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| IsolationError::ExecutionFailed {
                message: format!("docker run: {e}"),
            })?;

        Ok(ExecutionOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn teardown(&self, ctx: &IsolationContext) -> Result<()> {
        if !ctx.mark_torn_down() {
            return Ok(());
        }

        // Force-remove the instance; with --rm it is usually gone already,
        // but a timed-out run may still be live.
        let _ = Command::new("docker")
            .args(["rm", "-f", &Self::container_name(ctx)])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        match tokio::fs::remove_dir_all(ctx.work_dir()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IsolationError::TeardownFailed {
                context_id: ctx.id().to_string(),
                message: format!("{}: {e}", ctx.work_dir().display()),
            }
            .into()),
        }
    }
}

async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| IsolationError::ExecutionFailed {
            message: format!("cannot stat build script: {e}"),
        })?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o755);
    tokio::fs::set_permissions(path, perms)
        .await
        .map_err(|e| {
            IsolationError::ExecutionFailed {
                message: format!("cannot mark build script executable: {e}"),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::select_image_environment;

    fn test_context() -> IsolationContext {
        let spec = select_image_environment("3.12", "manylinux", "x86_64", None).unwrap();
        let mut env = merge_env(&HashMap::new());
        env.insert("EXTRA".to_string(), "1".to_string());
        IsolationContext::new(
            "container",
            spec,
            "/tmp/wheelwright-container-test".into(),
            "/tmp/wheelwright-container-test/output".into(),
            env,
            vec![MountSpec::ro("/work/src", "/src")],
        )
    }

    #[test]
    fn run_args_pin_image_and_mount_modes() {
        let _guard = crate::backend::CONTEXT_COUNTER_TEST_LOCK.lock().unwrap();
        let ctx = test_context();
        let limits = ResourceLimits {
            memory: Some("4g".to_string()),
            cpus: Some(2.0),
            network: false,
        };
        let args = ContainerBackend::run_args(&ctx, &limits, "quay.io/pypa/manylinux_2_28_x86_64");

        assert_eq!(args[0], "run");
        assert_eq!(args[1], "--rm");
        assert!(args.contains(&"--network=none".to_string()));
        assert!(args.contains(&"--memory".to_string()));
        assert!(args.contains(&"/work/src:/src:ro".to_string()));
        assert!(args
            .contains(&"/tmp/wheelwright-container-test/output:/output:rw".to_string()));
        assert!(args.contains(&"-e".to_string()));
        assert!(args.contains(&"PIP_NO_CACHE_DIR=1".to_string()));

        // Image comes last before the entrypoint
        let image_pos = args
            .iter()
            .position(|a| a == "quay.io/pypa/manylinux_2_28_x86_64")
            .unwrap();
        assert_eq!(args[image_pos + 1], "bash");
        assert_eq!(args[image_pos + 2], "/output/build.sh");

        ctx.mark_torn_down();
    }

    #[test]
    fn container_names_are_unique_per_context() {
        let _guard = crate::backend::CONTEXT_COUNTER_TEST_LOCK.lock().unwrap();
        let a = test_context();
        let b = test_context();
        assert_ne!(
            ContainerBackend::container_name(&a),
            ContainerBackend::container_name(&b)
        );
        a.mark_torn_down();
        b.mark_torn_down();
    }
}
