//! End-to-end pipeline tests with a scripted isolation backend

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wheelwright_builder::{BuildExecutor, BuildExecutorConfig};
use wheelwright_errors::{ErrorCode, Result};
use wheelwright_events::{AppEvent, BuildEvent};
use wheelwright_isolation::{
    BuildCommand, EnvironmentSpec, ExecutionOutput, IsolationBackend, IsolationContext, MountSpec,
    ResourceLimits,
};
use wheelwright_types::{BuildPhase, BuildRequest, IsolationMode, PhaseOutcome};

static MOCK_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// What the scripted backend does when `execute` is called
#[derive(Clone)]
enum MockScript {
    /// Write a wheel with the given entry names into staging, exit 0
    WriteWheel(Vec<&'static str>),
    /// Exit non-zero with the given stderr
    Fail(i32, String),
    /// Never finish (the executor's timeout must fire)
    Hang,
}

struct MockBackend {
    script: MockScript,
    provisioned: AtomicUsize,
    torn_down: AtomicUsize,
}

impl MockBackend {
    fn new(script: MockScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            provisioned: AtomicUsize::new(0),
            torn_down: AtomicUsize::new(0),
        })
    }

    fn residual_contexts(&self) -> usize {
        self.provisioned.load(Ordering::SeqCst) - self.torn_down.load(Ordering::SeqCst)
    }
}

fn write_wheel(path: &Path, entries: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for entry in entries {
        writer
            .start_file(*entry, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"data").unwrap();
    }
    writer.finish().unwrap();
}

#[async_trait]
impl IsolationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn available(&self) -> bool {
        true
    }

    async fn provision(
        &self,
        spec: &EnvironmentSpec,
        mounts: &[MountSpec],
        env_vars: &HashMap<String, String>,
    ) -> Result<IsolationContext> {
        let unique = MOCK_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let work_dir = std::env::temp_dir().join(format!(
            "wheelwright-mock-{}-{unique}",
            std::process::id()
        ));
        let staging_dir = work_dir.join("output");
        tokio::fs::create_dir_all(&staging_dir).await?;

        self.provisioned.fetch_add(1, Ordering::SeqCst);
        Ok(IsolationContext::new(
            self.name(),
            spec.clone(),
            work_dir,
            staging_dir,
            env_vars.clone(),
            mounts.to_vec(),
        ))
    }

    async fn execute(
        &self,
        ctx: &IsolationContext,
        _command: &BuildCommand,
        _limits: &ResourceLimits,
    ) -> Result<ExecutionOutput> {
        match &self.script {
            MockScript::WriteWheel(entries) => {
                let wheel = ctx.staging_dir().join("demo_pkg-1.0-py3-none-any.whl");
                write_wheel(&wheel, entries);
                Ok(ExecutionOutput {
                    exit_code: 0,
                    stdout: "Successfully built demo_pkg".to_string(),
                    stderr: String::new(),
                })
            }
            MockScript::Fail(exit_code, stderr) => Ok(ExecutionOutput {
                exit_code: *exit_code,
                stdout: String::new(),
                stderr: stderr.clone(),
            }),
            MockScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ExecutionOutput {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }
    }

    async fn teardown(&self, ctx: &IsolationContext) -> Result<()> {
        if !ctx.mark_torn_down() {
            return Ok(());
        }
        self.torn_down.fetch_add(1, Ordering::SeqCst);
        match tokio::fs::remove_dir_all(ctx.work_dir()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const GOOD_WHEEL: &[&str] = &[
    "demo_pkg/__init__.py",
    "demo_pkg-1.0.dist-info/METADATA",
    "demo_pkg-1.0.dist-info/WHEEL",
    "demo_pkg-1.0.dist-info/RECORD",
];

struct Fixture {
    _source: tempfile::TempDir,
    _dest_root: tempfile::TempDir,
    request: BuildRequest,
}

fn fixture() -> Fixture {
    let source = tempfile::tempdir().unwrap();
    std::fs::write(source.path().join("pyproject.toml"), "[build-system]\n").unwrap();
    let dest_root = tempfile::tempdir().unwrap();
    let dest = dest_root.path().join("dist");

    let request = BuildRequest::new(source.path(), "sha256:deadbeef", dest)
        .with_isolation(IsolationMode::Container)
        .with_platform("manylinux")
        .with_arch("x86_64")
        .with_runtime_version("3.12");

    Fixture {
        _source: source,
        _dest_root: dest_root,
        request,
    }
}

fn executor(backend: Arc<MockBackend>) -> BuildExecutor {
    BuildExecutor::new().with_container_backend(backend)
}

#[tokio::test]
async fn successful_build_publishes_and_records_phases() {
    let backend = MockBackend::new(MockScript::WriteWheel(GOOD_WHEEL.to_vec()));
    let fix = fixture();

    let result = executor(Arc::clone(&backend)).build(&fix.request).await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.error_code, None);
    assert_eq!(result.artifacts.len(), 1);
    assert_eq!(result.source_id, "sha256:deadbeef");

    let wheel = result.wheel_path().unwrap();
    assert!(wheel.exists());
    assert!(wheel.starts_with(&fix.request.output_dir));

    // Digest covers the final published bytes
    let expected = wheelwright_hash::Hash::hash_file(wheel).await.unwrap();
    assert_eq!(result.artifacts[0].digest, expected.to_hex());

    // All six phases succeeded, in order
    let phases: Vec<BuildPhase> = result.phases.iter().map(|r| r.phase).collect();
    assert_eq!(phases, BuildPhase::ORDER.to_vec());
    assert!(result
        .phases
        .iter()
        .all(|r| r.outcome == PhaseOutcome::Success));

    // Wheel filename metadata is surfaced
    let info = result.wheel_info.unwrap();
    assert_eq!(info.name, "demo-pkg");
    assert_eq!(info.version, "1.0");

    assert_eq!(backend.residual_contexts(), 0);
}

#[tokio::test]
async fn default_environment_is_the_documented_image() {
    let backend = MockBackend::new(MockScript::WriteWheel(GOOD_WHEEL.to_vec()));
    let fix = fixture();
    let (tx, mut rx) = wheelwright_events::channel();

    let result = executor(backend)
        .with_event_sender(tx)
        .build(&fix.request)
        .await;
    assert!(result.success);

    let mut selected = None;
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::Build(BuildEvent::EnvironmentSelected { reference }) = event {
            selected = Some(reference);
        }
    }
    assert_eq!(
        selected.as_deref(),
        Some("quay.io/pypa/manylinux_2_28_x86_64")
    );
}

#[tokio::test]
async fn unsafe_archive_entry_fails_validate_and_leaves_destination_unchanged() {
    // The only flaw is an absolute entry name
    let backend = MockBackend::new(MockScript::WriteWheel(vec![
        "/etc/passwd",
        "demo_pkg-1.0.dist-info/METADATA",
        "demo_pkg-1.0.dist-info/WHEEL",
    ]));
    let fix = fixture();

    let result = executor(Arc::clone(&backend)).build(&fix.request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::UnsafeArchive));
    assert!(result.message.contains("/etc/passwd"));
    assert!(result.message.contains("validate"));

    // Truncated at the failing phase
    let last = result.phases.last().unwrap();
    assert_eq!(last.phase, BuildPhase::Validate);
    assert!(matches!(last.outcome, PhaseOutcome::Failed { .. }));

    // Destination directory unchanged from its pre-build state
    let dest_entries: Vec<_> = match std::fs::read_dir(&fix.request.output_dir) {
        Ok(entries) => entries.collect(),
        Err(_) => Vec::new(),
    };
    assert!(dest_entries.is_empty());

    assert_eq!(backend.residual_contexts(), 0);
}

#[tokio::test]
async fn unsupported_runtime_fails_at_analyze_listing_supported_versions() {
    let backend = MockBackend::new(MockScript::WriteWheel(GOOD_WHEEL.to_vec()));
    let fix = fixture();
    let request = fix
        .request
        .clone()
        .with_isolation(IsolationMode::Venv)
        .with_runtime_version("3.8");

    let result = executor(backend).build(&request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::UnsupportedEnvironment));
    assert!(result.message.contains("3.9, 3.10, 3.11, 3.12, 3.13"));

    let last = result.phases.last().unwrap();
    assert_eq!(last.phase, BuildPhase::Analyze);
    assert_eq!(result.phases.len(), 2);
}

#[tokio::test]
async fn unknown_platform_arch_pair_fails_closed() {
    let backend = MockBackend::new(MockScript::WriteWheel(GOOD_WHEEL.to_vec()));
    let fix = fixture();
    let request = fix.request.clone().with_arch("riscv64");

    let result = executor(backend).build(&request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::UnsupportedEnvironment));
    // The message enumerates known keys
    assert!(result.message.contains("manylinux_2_28_x86_64"));
}

#[tokio::test]
async fn backend_failure_captures_bounded_stderr() {
    let stderr = "error: ".to_string() + &"x".repeat(200);
    let backend = MockBackend::new(MockScript::Fail(2, stderr));
    let fix = fixture();

    let executor = BuildExecutor::with_config(
        BuildExecutorConfig::default().with_max_stderr_bytes(64),
    )
    .with_container_backend(backend.clone());
    let result = executor.build(&fix.request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::BackendFailed));
    assert!(result.message.contains("exit code 2"));
    assert!(result.message.contains("[truncated]"));

    let last = result.phases.last().unwrap();
    assert_eq!(last.phase, BuildPhase::Execute);
    assert_eq!(backend.residual_contexts(), 0);
}

#[tokio::test]
async fn timeout_forces_teardown_with_no_residual_contexts() {
    let backend = MockBackend::new(MockScript::Hang);
    let fix = fixture();
    let request = fix.request.clone().with_timeout(1);

    let result = executor(Arc::clone(&backend)).build(&request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::BuildTimeout));

    let last = result.phases.last().unwrap();
    assert_eq!(last.phase, BuildPhase::Execute);
    assert_eq!(
        last.outcome,
        PhaseOutcome::Failed {
            code: ErrorCode::BuildTimeout
        }
    );

    // No leaked containers or temp directories
    assert_eq!(backend.residual_contexts(), 0);
}

#[tokio::test]
async fn cancellation_stops_the_pipeline_and_tears_down() {
    let backend = MockBackend::new(MockScript::Hang);
    let fix = fixture();

    let cancel = CancellationToken::new();
    let exec = executor(Arc::clone(&backend));
    let request = fix.request.clone();

    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { exec.build_with_cancellation(&request, &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    let result = handle.await.unwrap();

    assert!(!result.success);
    assert_eq!(backend.residual_contexts(), 0);
    // Execute never completed; nothing after it ran
    assert!(result
        .phases
        .iter()
        .all(|r| r.phase != BuildPhase::Validate && r.phase != BuildPhase::Publish));
}

#[tokio::test]
async fn missing_source_tree_fails_at_resolve() {
    let backend = MockBackend::new(MockScript::WriteWheel(GOOD_WHEEL.to_vec()));
    let dest = tempfile::tempdir().unwrap();
    let request = BuildRequest::new("/nonexistent/source", "sha256:0", dest.path().join("dist"))
        .with_isolation(IsolationMode::Container);

    let result = executor(backend).build(&request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::AnalyzeFailed));
    assert_eq!(result.phases.len(), 1);
    assert_eq!(result.phases[0].phase, BuildPhase::Resolve);
}

#[tokio::test]
async fn wheel_requested_but_not_produced_is_a_backend_failure() {
    // Backend "succeeds" but produces nothing
    let backend = MockBackend::new(MockScript::WriteWheel(vec![]));
    let fix = fixture();

    // Empty wheel still gets written; ask for an sdist that never appears
    let request = fix.request.clone().with_products(false, true);
    let result = executor(backend).build(&request).await;

    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::BackendFailed));
    assert_eq!(result.phases.last().unwrap().phase, BuildPhase::Validate);
}
