//! Baseline environment variables for isolated builds
//!
//! The baseline keeps builds non-interactive and reproducible; request
//! supplied variables merge under it and may never override its keys.

use std::collections::HashMap;

/// Keys that affect reproducibility; requests cannot override these
pub const BASELINE_KEYS: &[&str] = &[
    "DEBIAN_FRONTEND",
    "PIP_NO_CACHE_DIR",
    "PIP_DISABLE_PIP_VERSION_CHECK",
    "PYTHONDONTWRITEBYTECODE",
];

/// Fixed baseline applied to every isolation context
#[must_use]
pub fn baseline_env() -> HashMap<String, String> {
    let mut env = HashMap::new();
    // Disable interactive prompts
    env.insert("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string());
    // Pip settings
    env.insert("PIP_NO_CACHE_DIR".to_string(), "1".to_string());
    env.insert(
        "PIP_DISABLE_PIP_VERSION_CHECK".to_string(),
        "1".to_string(),
    );
    // Build settings
    env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
    env
}

/// Merge request variables under the baseline.
///
/// Baseline keys win on conflict.
#[must_use]
pub fn merge_env(extra: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = extra.clone();
    for (key, value) in baseline_env() {
        env.insert(key, value);
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_keys_cannot_be_overridden() {
        let mut extra = HashMap::new();
        extra.insert("PIP_NO_CACHE_DIR".to_string(), "0".to_string());
        extra.insert("MY_FLAG".to_string(), "yes".to_string());

        let merged = merge_env(&extra);
        assert_eq!(merged.get("PIP_NO_CACHE_DIR").unwrap(), "1");
        assert_eq!(merged.get("MY_FLAG").unwrap(), "yes");
    }

    #[test]
    fn baseline_covers_declared_keys() {
        let baseline = baseline_env();
        for key in BASELINE_KEYS {
            assert!(baseline.contains_key(*key), "missing baseline key {key}");
        }
    }
}
