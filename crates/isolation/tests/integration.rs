//! Integration tests for environment selection and script generation

use wheelwright_errors::{Error, IsolationError};
use wheelwright_isolation::{
    generate_build_script, resolve_image, select_image_environment, BuildCommand, EnvironmentId,
    SUPPORTED_RUNTIME_VERSIONS,
};

#[test]
fn every_supported_pair_selects_deterministically() {
    let pairs = [
        ("manylinux", "x86_64"),
        ("manylinux", "aarch64"),
        ("musllinux", "x86_64"),
        ("musllinux", "aarch64"),
    ];
    for (platform, arch) in pairs {
        for version in SUPPORTED_RUNTIME_VERSIONS {
            let first = select_image_environment(version, platform, arch, None).unwrap();
            let second = select_image_environment(version, platform, arch, None).unwrap();
            assert_eq!(first, second, "{platform}/{arch}/{version} not stable");
            assert!(first.image_reference().unwrap().starts_with("quay.io/pypa/"));
        }
    }
}

#[test]
fn absent_pairs_fail_listing_known_keys() {
    let err = resolve_image("manylinux", "s390x", None).unwrap_err();
    let Error::Isolation(IsolationError::UnsupportedEnvironment { available, .. }) = err else {
        panic!("expected UnsupportedEnvironment");
    };
    assert!(available.contains("manylinux2014_x86_64"));
}

#[test]
fn generated_script_round_trips_through_spec_interpreter() {
    let spec = select_image_environment("3.13", "manylinux", "x86_64", None).unwrap();
    let EnvironmentId::Image { interpreter, .. } = spec.id() else {
        panic!("expected image environment");
    };

    let command = BuildCommand::new(true, true)
        .with_requirements(vec!["setuptools>=68".to_string()])
        .with_repair(true);
    let script = generate_build_script(interpreter, &command);

    assert!(script.contains("/opt/python/cp313-cp313/bin/python"));
    assert!(script.contains("auditwheel repair"));
    // Both products requested: sdists are copied out alongside repaired wheels
    assert!(script.contains("*.tar.gz"));
}
