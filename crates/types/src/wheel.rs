//! Wheel filename metadata
//!
//! Wheel filenames follow
//! `{distribution}-{version}(-{build tag})?-{python}-{abi}-{platform}.whl`.

use serde::{Deserialize, Serialize};
use wheelwright_errors::{Error, Result};

/// Metadata parsed from a wheel filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelInfo {
    /// Distribution name, with underscores folded back to hyphens
    pub name: String,
    pub version: String,
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
}

impl WheelInfo {
    /// Parse a wheel filename.
    ///
    /// # Errors
    ///
    /// Returns an error if the filename does not have the five required
    /// dash-separated components.
    pub fn parse(filename: &str) -> Result<Self> {
        let stem = filename.strip_suffix(".whl").ok_or_else(|| {
            Error::internal(format!("not a wheel filename: {filename}"))
        })?;

        let parts: Vec<&str> = stem.split('-').collect();
        if parts.len() < 5 {
            return Err(Error::internal(format!(
                "invalid wheel filename: {filename} (expected {{distribution}}-{{version}}-{{python}}-{{abi}}-{{platform}}.whl)"
            )));
        }

        Ok(Self {
            name: parts[0].replace('_', "-"),
            version: parts[1].to_string(),
            python_tag: parts[parts.len() - 3].to_string(),
            abi_tag: parts[parts.len() - 2].to_string(),
            platform_tag: parts[parts.len() - 1].to_string(),
        })
    }

    /// Whether the wheel is universal (pure Python, any platform)
    #[must_use]
    pub fn is_universal(&self) -> bool {
        matches!(self.python_tag.as_str(), "py2.py3" | "py3")
            && self.abi_tag == "none"
            && self.platform_tag == "any"
    }

    /// Whether the wheel carries a manylinux or musllinux platform tag
    #[must_use]
    pub fn is_portable_linux(&self) -> bool {
        let tag = self.platform_tag.to_lowercase();
        tag.contains("manylinux") || tag.contains("musllinux")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_filename() {
        let info = WheelInfo::parse("my_pkg-1.2.3-cp312-cp312-manylinux_2_28_x86_64.whl").unwrap();
        assert_eq!(info.name, "my-pkg");
        assert_eq!(info.version, "1.2.3");
        assert_eq!(info.python_tag, "cp312");
        assert_eq!(info.abi_tag, "cp312");
        assert_eq!(info.platform_tag, "manylinux_2_28_x86_64");
        assert!(info.is_portable_linux());
        assert!(!info.is_universal());
    }

    #[test]
    fn parses_build_tag_variant() {
        let info = WheelInfo::parse("pkg-1.0-1-py3-none-any.whl").unwrap();
        assert_eq!(info.python_tag, "py3");
        assert!(info.is_universal());
    }

    #[test]
    fn rejects_short_filename() {
        assert!(WheelInfo::parse("pkg-1.0.whl").is_err());
        assert!(WheelInfo::parse("pkg-1.0.tar.gz").is_err());
    }
}
