//! Build orchestration
//!
//! The executor owns the full pipeline: Resolve, Analyze, Provision,
//! Execute, Validate, Publish. Phases run in strict linear order with no
//! backward transitions, every transition is timed, and the isolation
//! context is torn down on every exit path from Execute onward.

use crate::config::BuildExecutorConfig;
use crate::metadata::{MetadataProvider, StaticMetadata};
use crate::publish;
use crate::validation;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wheelwright_errors::{BuildError, Error, Result, UserFacingError};
use wheelwright_events::{
    AppEvent, BuildEvent, EventEmitter, EventSender, FailureContext,
};
use wheelwright_isolation::{
    select_host_environment, select_image_environment, BuildCommand, ContainerBackend,
    EnvironmentSpec, ExecutionOutput, IsolationBackend, IsolationContext, MountSpec,
    ResourceLimits, VenvBackend, CONTAINER_SOURCE_DIR, SCRIPT_NAME,
};
use wheelwright_types::{
    Artifact, ArtifactKind, BuildPhase, BuildRequest, BuildResult, IsolationMode, PhaseLog,
    PhaseOutcome, ProjectMetadata, PublishedArtifact, WheelInfo,
};

/// Everything Analyze resolves for the later phases
struct BuildPlan {
    backend: Arc<dyn IsolationBackend>,
    spec: EnvironmentSpec,
    command: BuildCommand,
    limits: ResourceLimits,
}

/// Build executor
#[derive(Clone)]
pub struct BuildExecutor {
    config: BuildExecutorConfig,
    metadata: Arc<dyn MetadataProvider>,
    venv_backend: Arc<dyn IsolationBackend>,
    container_backend: Arc<dyn IsolationBackend>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for BuildExecutor {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl BuildExecutor {
    /// Create an executor with default configuration and backends
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BuildExecutorConfig::default())
    }

    /// Create an executor with the given configuration
    #[must_use]
    pub fn with_config(config: BuildExecutorConfig) -> Self {
        Self {
            config,
            metadata: Arc::new(StaticMetadata::default()),
            venv_backend: Arc::new(VenvBackend::new()),
            container_backend: Arc::new(ContainerBackend::new()),
            event_sender: None,
        }
    }

    /// Set the metadata collaborator
    #[must_use]
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = provider;
        self
    }

    /// Replace the venv backend (tests, alternative implementations)
    #[must_use]
    pub fn with_venv_backend(mut self, backend: Arc<dyn IsolationBackend>) -> Self {
        self.venv_backend = backend;
        self
    }

    /// Replace the container backend (tests, alternative implementations)
    #[must_use]
    pub fn with_container_backend(mut self, backend: Arc<dyn IsolationBackend>) -> Self {
        self.container_backend = backend;
        self
    }

    /// Set the event sender
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Process one build request to completion.
    ///
    /// Never returns an error: failures are folded into the result with a
    /// terminal `ErrorCode` and the truncated phase sequence.
    pub async fn build(&self, request: &BuildRequest) -> BuildResult {
        self.build_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Process one build request, aborting early when `cancel` fires.
    ///
    /// Cancellation forces teardown of any live isolation context; no phase
    /// after Execute begins once cancellation is observed.
    pub async fn build_with_cancellation(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> BuildResult {
        let started = Instant::now();
        self.emit(AppEvent::Build(BuildEvent::Started {
            source_id: request.source_id.clone(),
            isolation: request.isolation.to_string(),
        }));

        let mut log = PhaseLog::new();
        let outcome = self.run_pipeline(request, cancel, &mut log).await;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (result, failure) = match outcome {
            Ok((artifacts, wheel_info)) => (
                BuildResult::succeeded(
                    artifacts,
                    log.into_records(),
                    request.source_id.clone(),
                    wheel_info,
                ),
                None,
            ),
            Err(error) => {
                let failure = FailureContext::from_error(&error);
                let code = error.build_code();
                let message = log.failed_phase().map_or_else(
                    || error.user_message().into_owned(),
                    |(phase, _)| format!("{phase} phase failed: {}", error.user_message()),
                );
                (
                    BuildResult::failed(code, message, log.into_records(), request.source_id.clone()),
                    Some(failure),
                )
            }
        };

        self.emit(AppEvent::Build(BuildEvent::Completed {
            success: result.success,
            duration_ms,
            failure,
        }));
        result
    }

    async fn run_pipeline(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
        log: &mut PhaseLog,
    ) -> Result<(Vec<PublishedArtifact>, Option<WheelInfo>)> {
        // Resolve: the tree is already materialized; fail fast if it is
        // missing or empty, and record the timing.
        ensure_not_cancelled(cancel)?;
        self.begin(log, BuildPhase::Resolve);
        self.close(log, resolve_source(&request.source_dir).await)?;

        // Analyze: metadata, runtime validation, environment selection.
        ensure_not_cancelled(cancel)?;
        self.begin(log, BuildPhase::Analyze);
        let plan = self.close(log, self.analyze(request).await)?;
        if let Some(reference) = plan.spec.image_reference() {
            self.emit(AppEvent::Build(BuildEvent::EnvironmentSelected {
                reference: reference.to_string(),
            }));
        }

        // Provision: path safety, then a fresh isolation context.
        ensure_not_cancelled(cancel)?;
        self.begin(log, BuildPhase::Provision);
        let ctx = self.close(log, self.provision(request, &plan).await)?;
        self.emit(AppEvent::Build(BuildEvent::ContextProvisioned {
            context_id: ctx.id().to_string(),
            backend: ctx.backend().to_string(),
        }));

        // From here on the context is torn down on every exit path.
        let pipeline_result = self
            .execute_validate_publish(request, cancel, log, &plan, &ctx)
            .await;

        match plan.backend.teardown(&ctx).await {
            Ok(()) => self.emit(AppEvent::Build(BuildEvent::ContextTornDown {
                context_id: ctx.id().to_string(),
            })),
            // Cleanup failure never overrides the primary outcome
            Err(teardown_error) => self.emit_warning_with_context(
                "isolation context teardown failed",
                teardown_error.to_string(),
            ),
        }

        pipeline_result
    }

    async fn execute_validate_publish(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
        log: &mut PhaseLog,
        plan: &BuildPlan,
        ctx: &IsolationContext,
    ) -> Result<(Vec<PublishedArtifact>, Option<WheelInfo>)> {
        // Execute: the only long-blocking phase, and the only one with a
        // caller-configurable timeout.
        self.begin(log, BuildPhase::Execute);
        self.close(log, self.execute(request, cancel, plan, ctx).await)?;

        // Validate: every candidate, all-or-nothing.
        ensure_not_cancelled(cancel)?;
        self.begin(log, BuildPhase::Validate);
        let candidates = self.close(log, self.validate(request, ctx).await)?;

        // Publish: atomic promotion into the destination directory.
        ensure_not_cancelled(cancel)?;
        self.begin(log, BuildPhase::Publish);
        let published = self.close(log, self.publish(request, &candidates).await)?;

        let wheel_info = published
            .iter()
            .find(|a| a.kind == ArtifactKind::Wheel)
            .and_then(|a| a.path.file_name())
            .and_then(|name| WheelInfo::parse(&name.to_string_lossy()).ok());

        Ok((published, wheel_info))
    }

    async fn analyze(&self, request: &BuildRequest) -> Result<BuildPlan> {
        let metadata: ProjectMetadata = self
            .metadata
            .collect(&request.source_dir)
            .await
            .map_err(|e| BuildError::AnalyzeFailed {
                message: e.to_string(),
            })?;

        // Runtime validation is centralized here; the selector re-checks as
        // defense in depth.
        wheelwright_isolation::validate_runtime_version(&request.runtime_version)?;

        let mode = self.concrete_mode(request.isolation).await;
        let backend = match mode {
            IsolationMode::Container => Arc::clone(&self.container_backend),
            _ => Arc::clone(&self.venv_backend),
        };

        let spec = match mode {
            IsolationMode::Container => select_image_environment(
                &request.runtime_version,
                &request.platform,
                &request.arch,
                request.image_override.as_deref(),
            )?,
            _ => select_host_environment(&request.runtime_version, &request.arch)?,
        };

        // Manifest facts merge under the request's explicit settings
        let mut requirements = metadata.build_requirements.clone();
        for req in &request.build_requirements {
            if !requirements.contains(req) {
                requirements.push(req.clone());
            }
        }
        let mut settings: HashMap<String, String> = metadata.backend_settings.clone();
        settings.extend(request.config_settings.clone());

        let command = BuildCommand::new(request.build_wheel, request.build_sdist)
            .with_requirements(requirements)
            .with_config_settings(&settings)
            .with_repair(request.repair_wheel && mode == IsolationMode::Container);

        let limits = ResourceLimits {
            memory: request.memory_limit.clone(),
            cpus: request.cpu_limit,
            network: request.network,
        };

        Ok(BuildPlan {
            backend,
            spec,
            command,
            limits,
        })
    }

    /// Resolve `auto` to a concrete backend once, at Analyze
    async fn concrete_mode(&self, requested: IsolationMode) -> IsolationMode {
        match requested {
            IsolationMode::Auto => {
                if self.container_backend.available().await {
                    IsolationMode::Container
                } else {
                    IsolationMode::Venv
                }
            }
            other => other,
        }
    }

    async fn provision(
        &self,
        request: &BuildRequest,
        plan: &BuildPlan,
    ) -> Result<IsolationContext> {
        let mut mounts = vec![MountSpec::ro(&request.source_dir, CONTAINER_SOURCE_DIR)];
        for extra in &request.extra_mounts {
            mounts.push(MountSpec {
                source: extra.source.clone(),
                target: extra.target.clone(),
                writable: extra.writable,
            });
        }

        validation::validate_mounts(
            &mounts,
            &[request.source_dir.as_path(), request.output_dir.as_path()],
        )?;

        plan.backend
            .provision(&plan.spec, &mounts, &request.extra_env)
            .await
    }

    async fn execute(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
        plan: &BuildPlan,
        ctx: &IsolationContext,
    ) -> Result<()> {
        let staging = ctx.staging_dir().display().to_string();
        self.emit(AppEvent::Build(BuildEvent::CommandStarted {
            command: format!(
                "{} {}",
                plan.spec.interpreter(),
                plan.command.build_args(&staging).join(" ")
            ),
        }));

        let timeout_seconds = request
            .timeout_seconds
            .or(self.config.default_timeout_seconds);
        let exec = plan.backend.execute(ctx, &plan.command, &plan.limits);

        let output: ExecutionOutput = tokio::select! {
            () = cancel.cancelled() => return Err(BuildError::Cancelled.into()),
            outcome = run_with_optional_timeout(exec, timeout_seconds) => outcome?,
        };

        self.emit(AppEvent::Build(BuildEvent::CommandCompleted {
            exit_code: output.exit_code,
        }));

        if output.success() {
            Ok(())
        } else {
            Err(BuildError::BackendFailed {
                exit_code: output.exit_code,
                stderr: truncate_tail(&output.stderr, self.config.max_stderr_bytes),
            }
            .into())
        }
    }

    async fn validate(
        &self,
        request: &BuildRequest,
        ctx: &IsolationContext,
    ) -> Result<Vec<Artifact>> {
        let candidates = discover_artifacts(ctx.staging_dir()).await?;
        for candidate in &candidates {
            self.emit(AppEvent::Build(BuildEvent::ArtifactDiscovered {
                file_name: candidate.file_name(),
            }));
        }

        let has = |kind: ArtifactKind| candidates.iter().any(|a| a.kind == kind);
        if (request.build_wheel && !has(ArtifactKind::Wheel))
            || (request.build_sdist && !has(ArtifactKind::Sdist))
        {
            return Err(BuildError::NoArtifactsProduced {
                dir: ctx.staging_dir().display().to_string(),
            }
            .into());
        }

        // Any unsafe candidate aborts the whole request; nothing is
        // partially published.
        for candidate in &candidates {
            validation::validate_archive(&candidate.path, candidate.kind).await?;
        }
        Ok(candidates)
    }

    async fn publish(
        &self,
        request: &BuildRequest,
        candidates: &[Artifact],
    ) -> Result<Vec<PublishedArtifact>> {
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &request.output_dir))?;

        let published = publish::publish_all(candidates, &request.output_dir).await?;
        for artifact in &published {
            self.emit(AppEvent::Build(BuildEvent::ArtifactPublished {
                file_name: artifact
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                digest: artifact.digest.clone(),
            }));
        }
        Ok(published)
    }

    fn begin(&self, log: &mut PhaseLog, phase: BuildPhase) {
        log.begin(phase);
        self.emit(AppEvent::Build(BuildEvent::PhaseStarted { phase }));
    }

    /// Close the open phase with the outcome of `result`, passing it through.
    fn close<T>(&self, log: &mut PhaseLog, result: Result<T>) -> Result<T> {
        let result = match result {
            Ok(value) => {
                log.complete();
                Ok(value)
            }
            Err(error) => {
                log.fail(error.build_code());
                Err(error)
            }
        };

        if let Some(record) = log.records().last() {
            self.emit(AppEvent::Build(BuildEvent::PhaseCompleted {
                phase: record.phase,
                duration_ms: u64::try_from(record.duration().num_milliseconds()).unwrap_or(0),
                success: record.outcome == PhaseOutcome::Success,
            }));
        }
        result
    }
}

impl Default for BuildExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(BuildError::Cancelled.into())
    } else {
        Ok(())
    }
}

async fn run_with_optional_timeout(
    exec: impl std::future::Future<Output = Result<ExecutionOutput>>,
    timeout_seconds: Option<u64>,
) -> Result<ExecutionOutput> {
    match timeout_seconds {
        Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), exec)
            .await
            .map_err(|_| Error::from(BuildError::Timeout { seconds }))?,
        None => exec.await,
    }
}

async fn resolve_source(source_dir: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(source_dir).await.map_err(|_| {
        Error::from(BuildError::SourceMissing {
            path: source_dir.display().to_string(),
        })
    })?;
    if !metadata.is_dir() {
        return Err(BuildError::SourceMissing {
            path: source_dir.display().to_string(),
        }
        .into());
    }

    let mut entries = tokio::fs::read_dir(source_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, source_dir))?;
    if entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, source_dir))?
        .is_none()
    {
        return Err(BuildError::SourceEmpty {
            path: source_dir.display().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Candidate outputs in the staging directory, generated script excluded
async fn discover_artifacts(staging_dir: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    let mut entries = tokio::fs::read_dir(staging_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, staging_dir))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, staging_dir))?
    {
        let path = entry.path();
        if path.file_name().is_some_and(|n| n == SCRIPT_NAME) {
            continue;
        }
        if let Some(kind) = ArtifactKind::from_path(&path) {
            artifacts.push(Artifact::new(kind, path));
        }
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

/// Keep the last `max_bytes` of captured output, marking the cut.
fn truncate_tail(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("... [truncated] {}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_the_tail() {
        let text = "a".repeat(10) + "TAIL";
        let truncated = truncate_tail(&text, 4);
        assert!(truncated.ends_with("TAIL"));
        assert!(truncated.starts_with("... [truncated]"));

        assert_eq!(truncate_tail("short", 100), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "héllo wörld très long";
        let truncated = truncate_tail(text, 5);
        assert!(truncated.contains("long"));
    }
}
