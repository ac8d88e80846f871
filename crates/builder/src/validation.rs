//! Safety validation of mounts and build outputs
//!
//! Pure, read-only checks. Nothing here mutates the filesystem; deletion
//! decisions belong to callers.

use std::path::{Component, Path, PathBuf};
use tokio::task;
use wheelwright_errors::{Error, Result, ValidationError};
use wheelwright_isolation::MountSpec;
use wheelwright_types::ArtifactKind;

/// The two structural entries every wheel must carry
pub const WHEEL_REQUIRED_ENTRIES: [&str; 2] = [".dist-info/METADATA", ".dist-info/WHEEL"];

/// The two structural entries every sdist must carry
pub const SDIST_REQUIRED_ENTRIES: [&str; 2] = ["PKG-INFO", "pyproject.toml"];

/// Validate mount sources and targets before provisioning.
///
/// Rejects parent-directory traversal segments anywhere, and source paths
/// outside the permitted roots.
///
/// # Errors
///
/// Fails with `UnsafePath` naming the offending path.
pub fn validate_mounts(mounts: &[MountSpec], permitted_roots: &[&Path]) -> Result<()> {
    for mount in mounts {
        check_no_traversal(&mount.source)?;
        check_no_traversal(&mount.target)?;

        if !mount.source.is_absolute() {
            return Err(ValidationError::UnsafePath {
                path: mount.source.display().to_string(),
                reason: "mount sources must be absolute".to_string(),
            }
            .into());
        }

        if !permitted_roots
            .iter()
            .any(|root| mount.source.starts_with(root))
        {
            return Err(ValidationError::UnsafePath {
                path: mount.source.display().to_string(),
                reason: "outside the permitted project/output roots".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn check_no_traversal(path: &Path) -> Result<()> {
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ValidationError::UnsafePath {
            path: path.display().to_string(),
            reason: "contains a parent-directory traversal segment".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validate a candidate archive before publication.
///
/// Every entry name is inspected: absolute paths and traversal segments are
/// rejected with the exact offending entry in the error, and the archive
/// must contain its format's two structural metadata entries.
///
/// # Errors
///
/// Fails with `UnsafeArchiveEntry`, `MissingRequiredMetadata`, or
/// `UnreadableArchive`.
pub async fn validate_archive(path: &Path, kind: ArtifactKind) -> Result<()> {
    let path = path.to_path_buf();
    task::spawn_blocking(move || match kind {
        ArtifactKind::Wheel => validate_wheel(&path),
        ArtifactKind::Sdist => validate_sdist(&path),
    })
    .await
    .map_err(|e| Error::internal(format!("archive validation task failed: {e}")))?
}

fn archive_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn unreadable(path: &Path, err: impl std::fmt::Display) -> Error {
    ValidationError::UnreadableArchive {
        archive: archive_name(path),
        message: err.to_string(),
    }
    .into()
}

/// Reject absolute entries and traversal segments, naming the exact entry.
fn check_entry_name(archive: &Path, entry: &str) -> Result<()> {
    let entry_path = PathBuf::from(entry);
    if entry.starts_with('/') || entry_path.is_absolute() {
        return Err(ValidationError::UnsafeArchiveEntry {
            archive: archive_name(archive),
            entry: entry.to_string(),
            reason: "absolute path".to_string(),
        }
        .into());
    }
    if entry_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ValidationError::UnsafeArchiveEntry {
            archive: archive_name(archive),
            entry: entry.to_string(),
            reason: "parent-directory traversal segment".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_wheel(path: &Path) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| unreadable(path, e))?;
    let archive = zip::ZipArchive::new(file).map_err(|e| unreadable(path, e))?;

    let names: Vec<String> = archive.file_names().map(ToString::to_string).collect();
    for name in &names {
        check_entry_name(path, name)?;
    }

    for required in WHEEL_REQUIRED_ENTRIES {
        if !names.iter().any(|n| n.ends_with(required)) {
            return Err(ValidationError::MissingRequiredMetadata {
                archive: archive_name(path),
                entry: format!("*{required}"),
            }
            .into());
        }
    }
    Ok(())
}

fn validate_sdist(path: &Path) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| unreadable(path, e))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    let mut names = Vec::new();
    let entries = archive.entries().map_err(|e| unreadable(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| unreadable(path, e))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        check_entry_name(path, &name)?;
        names.push(name);
    }

    for required in SDIST_REQUIRED_ENTRIES {
        let found = names.iter().any(|n| {
            n == required
                || n.ends_with(&format!("/{required}"))
        });
        if !found {
            return Err(ValidationError::MissingRequiredMetadata {
                archive: archive_name(path),
                entry: required.to_string(),
            }
            .into());
        }
    }
    Ok(())
}
