//! Ephemeral virtualenv isolation
//!
//! Provisioning creates a throwaway interpreter environment rooted at a
//! unique temporary directory; teardown removes the whole tree. Directories
//! are never reused across builds.

use crate::backend::{
    BuildCommand, ExecutionOutput, IsolationBackend, IsolationContext, MountSpec, ResourceLimits,
};
use crate::script::CONTAINER_SOURCE_DIR;
use crate::spec::{EnvironmentId, EnvironmentSpec};
use crate::variables::merge_env;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;
use wheelwright_errors::{Error, IsolationError, Result};

/// Ephemeral-venv isolation backend
#[derive(Debug, Default, Clone)]
pub struct VenvBackend;

impl VenvBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn venv_dir(ctx: &IsolationContext) -> PathBuf {
        ctx.work_dir().join("venv")
    }

    fn venv_python(ctx: &IsolationContext) -> PathBuf {
        Self::venv_dir(ctx).join("bin").join("python")
    }

    /// Host source directory, recovered from the context's source mount
    fn source_dir(ctx: &IsolationContext) -> Result<PathBuf> {
        ctx.mounts()
            .iter()
            .find(|m| m.target == Path::new(CONTAINER_SOURCE_DIR))
            .map(|m| m.source.clone())
            .ok_or_else(|| {
                Error::from(IsolationError::ExecutionFailed {
                    message: "context has no source mount".to_string(),
                })
            })
    }

    async fn run_step(
        ctx: &IsolationContext,
        program: &Path,
        args: &[String],
        cwd: &Path,
    ) -> Result<ExecutionOutput> {
        let output = Command::new(program)
            .args(args)
            .envs(ctx.env_vars())
            .current_dir(cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| IsolationError::ExecutionFailed {
                message: format!("{}: {e}", program.display()),
            })?;

        Ok(ExecutionOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl IsolationBackend for VenvBackend {
    fn name(&self) -> &'static str {
        "venv"
    }

    async fn available(&self) -> bool {
        which::which("python3").is_ok()
    }

    async fn provision(
        &self,
        spec: &EnvironmentSpec,
        mounts: &[MountSpec],
        env_vars: &HashMap<String, String>,
    ) -> Result<IsolationContext> {
        let EnvironmentId::Interpreter { path: interpreter } = spec.id() else {
            return Err(IsolationError::ProvisionFailed {
                message: "venv backend requires a host interpreter environment".to_string(),
            }
            .into());
        };

        // Unique per provision call, never reused across builds
        let work_dir =
            std::env::temp_dir().join(format!("wheelwright-venv-{}", Uuid::new_v4().simple()));
        let staging_dir = work_dir.join("output");
        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| IsolationError::ProvisionFailed {
                message: format!("no writable temp space at {}: {e}", work_dir.display()),
            })?;

        let venv_dir = work_dir.join("venv");
        let create = Command::new(interpreter)
            .args(["-m", "venv"])
            .arg(&venv_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| IsolationError::ProvisionFailed {
                message: format!("failed to launch {}: {e}", interpreter.display()),
            })?;

        if !create.status.success() {
            // Partial venv trees are removed here; teardown also tolerates them
            let _ = tokio::fs::remove_dir_all(&work_dir).await;
            return Err(IsolationError::ProvisionFailed {
                message: format!(
                    "venv creation failed: {}",
                    String::from_utf8_lossy(&create.stderr).trim()
                ),
            }
            .into());
        }

        // Venv binaries first on the search path
        let mut env = merge_env(env_vars);
        let venv_bin = venv_dir.join("bin");
        let path_value = std::env::var("PATH").map_or_else(
            |_| venv_bin.display().to_string(),
            |host_path| format!("{}:{host_path}", venv_bin.display()),
        );
        env.insert("PATH".to_string(), path_value);
        env.insert("VIRTUAL_ENV".to_string(), venv_dir.display().to_string());

        Ok(IsolationContext::new(
            self.name(),
            spec.clone(),
            work_dir,
            staging_dir,
            env,
            mounts.to_vec(),
        ))
    }

    async fn execute(
        &self,
        ctx: &IsolationContext,
        command: &BuildCommand,
        _limits: &ResourceLimits,
    ) -> Result<ExecutionOutput> {
        let python = Self::venv_python(ctx);
        let source_dir = Self::source_dir(ctx)?;

        // Bootstrap pip and the build frontend inside the venv
        let mut install_args: Vec<String> = ["-m", "pip", "install", "--upgrade", "pip", "build"]
            .iter()
            .map(ToString::to_string)
            .collect();
        install_args.extend(command.build_requirements.iter().cloned());

        let install = Self::run_step(ctx, &python, &install_args, &source_dir).await?;
        if !install.success() {
            return Ok(install);
        }

        let build_args = command.build_args(&ctx.staging_dir().display().to_string());
        let build = Self::run_step(ctx, &python, &build_args, &source_dir).await?;

        Ok(ExecutionOutput {
            exit_code: build.exit_code,
            stdout: format!("{}{}", install.stdout, build.stdout),
            stderr: format!("{}{}", install.stderr, build.stderr),
        })
    }

    async fn teardown(&self, ctx: &IsolationContext) -> Result<()> {
        if !ctx.mark_torn_down() {
            return Ok(());
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::active_contexts;
    use crate::spec::EnvironmentSpec;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    /// A stand-in interpreter: `stub -m venv DIR` creates DIR/bin/python
    /// as a script that always exits 0.
    fn write_stub_interpreter(dir: &Path) -> PathBuf {
        let stub = dir.join("stub-python");
        std::fs::write(
            &stub,
            "#!/bin/sh\nif [ \"$1\" = \"-m\" ] && [ \"$2\" = \"venv\" ]; then\n  mkdir -p \"$3/bin\"\n  printf '#!/bin/sh\\nexit 0\\n' > \"$3/bin/python\"\n  chmod 755 \"$3/bin/python\"\nfi\nexit 0\n",
        )
        .unwrap();
        let mut perms = std::fs::metadata(&stub).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&stub, perms).unwrap();
        stub
    }

    fn interpreter_spec(path: PathBuf) -> EnvironmentSpec {
        EnvironmentSpec::new(
            EnvironmentId::Interpreter { path },
            "3.12".to_string(),
            "host".to_string(),
            "x86_64".to_string(),
        )
    }

    #[tokio::test]
    async fn provision_execute_teardown_round_trip() {
        let _guard = crate::backend::CONTEXT_COUNTER_TEST_LOCK.lock().unwrap();
        let host = tempdir().unwrap();
        let source = tempdir().unwrap();
        let stub = write_stub_interpreter(host.path());
        let spec = interpreter_spec(stub);

        let backend = VenvBackend::new();
        let mounts = vec![MountSpec::ro(source.path(), CONTAINER_SOURCE_DIR)];
        let before = active_contexts();

        let ctx = backend
            .provision(&spec, &mounts, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(active_contexts(), before + 1);
        assert!(ctx.work_dir().exists());
        assert!(VenvBackend::venv_python(&ctx).exists());
        assert_eq!(ctx.env_vars().get("PIP_NO_CACHE_DIR").unwrap(), "1");
        assert!(ctx
            .env_vars()
            .get("PATH")
            .unwrap()
            .starts_with(&VenvBackend::venv_dir(&ctx).join("bin").display().to_string()));

        let output = backend
            .execute(&ctx, &BuildCommand::new(true, false), &ResourceLimits::default())
            .await
            .unwrap();
        assert!(output.success());

        let work_dir = ctx.work_dir().to_path_buf();
        backend.teardown(&ctx).await.unwrap();
        assert!(!work_dir.exists());
        assert_eq!(active_contexts(), before);

        // Idempotent: second teardown is a no-op
        backend.teardown(&ctx).await.unwrap();
        assert_eq!(active_contexts(), before);
    }

    #[tokio::test]
    async fn provisioning_directories_are_unique_per_build() {
        let _guard = crate::backend::CONTEXT_COUNTER_TEST_LOCK.lock().unwrap();
        let host = tempdir().unwrap();
        let source = tempdir().unwrap();
        let stub = write_stub_interpreter(host.path());
        let spec = interpreter_spec(stub);

        let backend = VenvBackend::new();
        let mounts = vec![MountSpec::ro(source.path(), CONTAINER_SOURCE_DIR)];

        let a = backend
            .provision(&spec, &mounts, &HashMap::new())
            .await
            .unwrap();
        let b = backend
            .provision(&spec, &mounts, &HashMap::new())
            .await
            .unwrap();
        assert_ne!(a.work_dir(), b.work_dir());

        backend.teardown(&a).await.unwrap();
        backend.teardown(&b).await.unwrap();
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_provision_failure() {
        let _guard = crate::backend::CONTEXT_COUNTER_TEST_LOCK.lock().unwrap();
        let source = tempdir().unwrap();
        let spec = interpreter_spec(PathBuf::from("/nonexistent/python3.12"));

        let backend = VenvBackend::new();
        let mounts = vec![MountSpec::ro(source.path(), CONTAINER_SOURCE_DIR)];
        let before = active_contexts();

        let err = backend
            .provision(&spec, &mounts, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Isolation(IsolationError::ProvisionFailed { .. })
        ));
        // Failed provisioning never registers a context
        assert_eq!(active_contexts(), before);
    }
}
