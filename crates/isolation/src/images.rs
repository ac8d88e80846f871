//! Known-environment tables and deterministic selection
//!
//! The tables are static data: canonical key to fully-qualified reference.
//! Image references are never assembled from request fields; requests only
//! produce lookup keys, and a missing key fails closed.

use wheelwright_errors::{Error, IsolationError, Result};

/// Official manylinux/musllinux images from PyPA, keyed by canonical
/// `{platform_tag}_{arch}` name.
pub const IMAGES: &[(&str, &str)] = &[
    // manylinux2014 - CentOS 7 based (oldest, most compatible)
    ("manylinux2014_x86_64", "quay.io/pypa/manylinux2014_x86_64"),
    ("manylinux2014_i686", "quay.io/pypa/manylinux2014_i686"),
    ("manylinux2014_aarch64", "quay.io/pypa/manylinux2014_aarch64"),
    // manylinux_2_28 - AlmaLinux 8 based (recommended for new projects)
    ("manylinux_2_28_x86_64", "quay.io/pypa/manylinux_2_28_x86_64"),
    ("manylinux_2_28_aarch64", "quay.io/pypa/manylinux_2_28_aarch64"),
    // manylinux_2_34 - AlmaLinux 9 based (newest glibc)
    ("manylinux_2_34_x86_64", "quay.io/pypa/manylinux_2_34_x86_64"),
    ("manylinux_2_34_aarch64", "quay.io/pypa/manylinux_2_34_aarch64"),
    // musllinux - Alpine based (for musl libc distros)
    ("musllinux_1_1_x86_64", "quay.io/pypa/musllinux_1_1_x86_64"),
    ("musllinux_1_1_aarch64", "quay.io/pypa/musllinux_1_1_aarch64"),
    ("musllinux_1_2_x86_64", "quay.io/pypa/musllinux_1_2_x86_64"),
    ("musllinux_1_2_aarch64", "quay.io/pypa/musllinux_1_2_aarch64"),
];

/// Interpreter paths inside the manylinux/musllinux images
pub const INTERPRETER_PATHS: &[(&str, &str)] = &[
    ("3.9", "/opt/python/cp39-cp39/bin/python"),
    ("3.10", "/opt/python/cp310-cp310/bin/python"),
    ("3.11", "/opt/python/cp311-cp311/bin/python"),
    ("3.12", "/opt/python/cp312-cp312/bin/python"),
    ("3.13", "/opt/python/cp313-cp313/bin/python"),
];

/// Default image key per platform family
pub const DEFAULT_IMAGE_KEYS: &[(&str, &str)] = &[
    ("manylinux", "manylinux_2_28"),
    ("musllinux", "musllinux_1_2"),
];

/// Platform family used when the request asks for `auto` or nothing
pub const DEFAULT_PLATFORM: &str = "manylinux";

/// Runtime versions available in the pinned images
pub const SUPPORTED_RUNTIME_VERSIONS: &[&str] = &["3.9", "3.10", "3.11", "3.12", "3.13"];

/// Fold architecture aliases onto the canonical table spelling.
#[must_use]
pub fn canonical_arch(arch: &str) -> &str {
    match arch {
        "amd64" | "x64" | "x86-64" => "x86_64",
        "arm64" => "aarch64",
        other => other,
    }
}

/// Reduce a requested version like "3.12.4" to the "3.12" table form.
#[must_use]
pub fn short_version(version: &str) -> String {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) => format!("{major}.{minor}"),
        _ => version.to_string(),
    }
}

/// Check a requested runtime version against the supported set.
///
/// # Errors
///
/// Fails with `UnsupportedRuntime` listing the supported set when the
/// version (reduced to major.minor) has no table entry.
pub fn validate_runtime_version(version: &str) -> Result<()> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return Err(IsolationError::UnsupportedRuntime {
            version: "(empty)".to_string(),
            supported: supported_versions_list(),
        }
        .into());
    }

    let short = short_version(trimmed);
    if SUPPORTED_RUNTIME_VERSIONS.contains(&short.as_str()) {
        Ok(())
    } else {
        Err(IsolationError::UnsupportedRuntime {
            version: trimmed.to_string(),
            supported: supported_versions_list(),
        }
        .into())
    }
}

/// Interpreter path inside the image for a supported runtime version.
///
/// # Errors
///
/// Fails with `UnsupportedRuntime` when the version is not in the table.
pub fn container_interpreter(version: &str) -> Result<&'static str> {
    validate_runtime_version(version)?;
    let short = short_version(version.trim());
    INTERPRETER_PATHS
        .iter()
        .find(|(v, _)| *v == short)
        .map(|(_, path)| *path)
        .ok_or_else(|| {
            Error::from(IsolationError::UnsupportedRuntime {
                version: version.to_string(),
                supported: supported_versions_list(),
            })
        })
}

/// Resolve the pinned image reference for a request.
///
/// An explicit override must match a table key or a table value exactly and
/// is returned verbatim; otherwise the canonical `{platform}_{arch}` key is
/// computed and looked up, failing closed with the available keys.
///
/// # Errors
///
/// Fails with `UnsupportedEnvironment` when the override or the computed
/// key has no table entry.
pub fn resolve_image(
    platform: &str,
    arch: &str,
    explicit_override: Option<&str>,
) -> Result<&'static str> {
    if let Some(requested) = explicit_override {
        return lookup_override(requested);
    }

    let family = match platform {
        "" | "auto" => DEFAULT_PLATFORM,
        other => other,
    };
    let base = DEFAULT_IMAGE_KEYS
        .iter()
        .find(|(p, _)| *p == family)
        .map(|(_, base)| *base)
        .ok_or_else(|| unsupported(family))?;

    let key = format!("{base}_{}", canonical_arch(arch));
    IMAGES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, image)| *image)
        .ok_or_else(|| unsupported(&key))
}

fn lookup_override(requested: &str) -> Result<&'static str> {
    // Accept a canonical key, or a reference already present in the table.
    IMAGES
        .iter()
        .find(|(key, image)| *key == requested || *image == requested)
        .map(|(_, image)| *image)
        .ok_or_else(|| unsupported(requested))
}

fn unsupported(requested: &str) -> Error {
    IsolationError::UnsupportedEnvironment {
        requested: requested.to_string(),
        available: available_keys_list(),
    }
    .into()
}

/// Comma-separated sorted list of known image keys (for error messages)
#[must_use]
pub fn available_keys_list() -> String {
    let mut keys: Vec<&str> = IMAGES.iter().map(|(k, _)| *k).collect();
    keys.sort_unstable();
    keys.join(", ")
}

/// Comma-separated sorted list of supported runtime versions
#[must_use]
pub fn supported_versions_list() -> String {
    let mut versions = SUPPORTED_RUNTIME_VERSIONS.to_vec();
    versions.sort_unstable();
    versions.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wheelwright_errors::ErrorCode;

    #[test]
    fn default_pair_resolves_to_documented_image() {
        let image = resolve_image("manylinux", "x86_64", None).unwrap();
        assert_eq!(image, "quay.io/pypa/manylinux_2_28_x86_64");
    }

    #[test]
    fn auto_platform_uses_default_family() {
        assert_eq!(
            resolve_image("auto", "x86_64", None).unwrap(),
            resolve_image("manylinux", "x86_64", None).unwrap()
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let first = resolve_image("musllinux", "aarch64", None).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve_image("musllinux", "aarch64", None).unwrap(), first);
        }
    }

    #[test]
    fn arch_aliases_fold_to_canonical() {
        assert_eq!(
            resolve_image("manylinux", "amd64", None).unwrap(),
            resolve_image("manylinux", "x86_64", None).unwrap()
        );
        assert_eq!(
            resolve_image("manylinux", "arm64", None).unwrap(),
            resolve_image("manylinux", "aarch64", None).unwrap()
        );
    }

    #[test]
    fn override_returns_exact_table_entry() {
        let image = resolve_image("auto", "x86_64", Some("manylinux2014_i686")).unwrap();
        assert_eq!(image, "quay.io/pypa/manylinux2014_i686");

        // Full references already in the table pass through verbatim
        let image =
            resolve_image("auto", "x86_64", Some("quay.io/pypa/musllinux_1_1_x86_64")).unwrap();
        assert_eq!(image, "quay.io/pypa/musllinux_1_1_x86_64");
    }

    #[test]
    fn unknown_override_fails_closed_listing_keys() {
        let err = resolve_image("auto", "x86_64", Some("evil.example.com/image")).unwrap_err();
        assert_eq!(err.build_code(), ErrorCode::UnsupportedEnvironment);
        assert!(err.to_string().contains("manylinux_2_28_x86_64"));
    }

    #[test]
    fn missing_key_fails_closed_listing_keys() {
        let err = resolve_image("musllinux", "i686", None).unwrap_err();
        assert_eq!(err.build_code(), ErrorCode::UnsupportedEnvironment);
        assert!(err.to_string().contains("musllinux_1_2_x86_64"));
    }

    #[test]
    fn runtime_versions_validate_against_supported_set() {
        assert!(validate_runtime_version("3.12").is_ok());
        assert!(validate_runtime_version("3.12.4").is_ok());

        let err = validate_runtime_version("3.8").unwrap_err();
        assert_eq!(err.build_code(), ErrorCode::UnsupportedEnvironment);
        assert!(err.to_string().contains("3.9, 3.10, 3.11, 3.12, 3.13"));
    }

    #[test]
    fn container_interpreter_paths_are_pinned() {
        assert_eq!(
            container_interpreter("3.11").unwrap(),
            "/opt/python/cp311-cp311/bin/python"
        );
        assert_eq!(
            container_interpreter("3.11.9").unwrap(),
            "/opt/python/cp311-cp311/bin/python"
        );
        assert!(container_interpreter("2.7").is_err());
    }
}
