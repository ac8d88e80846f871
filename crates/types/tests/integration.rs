//! Integration tests for core types

use std::path::Path;
use wheelwright_types::{
    ArtifactKind, BuildPhase, BuildRequest, BuildResult, IsolationMode, PhaseLog, WheelInfo,
};

#[test]
fn build_request_defaults() {
    let request = BuildRequest::new("/work/src", "sha256:deadbeef", "/work/dist");
    assert_eq!(request.platform, "auto");
    assert_eq!(request.arch, "x86_64");
    assert_eq!(request.isolation, IsolationMode::Auto);
    assert!(request.build_wheel);
    assert!(!request.build_sdist);
    assert!(request.network);
}

#[test]
fn build_request_builder_chain() {
    let request = BuildRequest::new("/work/src", "sha256:deadbeef", "/work/dist")
        .with_runtime_version("3.11")
        .with_platform("musllinux")
        .with_arch("aarch64")
        .with_isolation(IsolationMode::Container)
        .with_products(true, true)
        .with_timeout(600)
        .without_network();

    assert_eq!(request.runtime_version, "3.11");
    assert_eq!(request.platform, "musllinux");
    assert_eq!(request.arch, "aarch64");
    assert!(request.build_sdist);
    assert_eq!(request.timeout_seconds, Some(600));
    assert!(!request.network);
}

#[test]
fn result_serializes_with_phase_log() {
    let mut log = PhaseLog::new();
    log.begin(BuildPhase::Resolve);
    log.complete();
    log.begin(BuildPhase::Analyze);
    log.fail(wheelwright_errors::ErrorCode::AnalyzeFailed);

    let result = BuildResult::failed(
        wheelwright_errors::ErrorCode::AnalyzeFailed,
        "analyze failed: no metadata",
        log.into_records(),
        "sha256:deadbeef".into(),
    );

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"analyze_failed\""));

    let parsed: BuildResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.phases.len(), 2);
    assert_eq!(parsed.phases[1].phase, BuildPhase::Analyze);
}

#[test]
fn artifact_kind_round_trip_with_wheel_info() {
    let name = "demo_pkg-0.4.0-cp312-cp312-manylinux_2_28_x86_64.whl";
    assert_eq!(
        ArtifactKind::from_path(Path::new(name)),
        Some(ArtifactKind::Wheel)
    );
    let info = WheelInfo::parse(name).unwrap();
    assert_eq!(info.name, "demo-pkg");
    assert_eq!(info.version, "0.4.0");
}
