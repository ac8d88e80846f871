//! Atomic artifact publication
//!
//! Artifacts are staged as temporary files inside the destination directory
//! (same filesystem), fsynced, then promoted with a single atomic rename. A
//! reader of the destination never observes a partially written file under
//! a final artifact name. The destination guard also protects the stale
//! artifact cleanup below, which globs only artifact patterns.

use crate::validation;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use wheelwright_errors::{Error, PublishError, Result};
use wheelwright_hash::Hash;
use wheelwright_types::{Artifact, PublishedArtifact};

/// Destinations the writer refuses outright, independent of any cleanup
/// logic elsewhere.
const DANGEROUS_DESTINATIONS: &[&str] = &["/", "/home", "/root", "/tmp", "/var", "/opt", "/usr"];

/// File patterns eligible for stale-artifact cleanup
const CLEANUP_SUFFIXES: &[&str] = &[".whl", ".tar.gz", ".zip"];

/// Refuse to operate on a filesystem root, a shared system directory, or
/// the user's home directory.
///
/// # Errors
///
/// Fails with `DangerousDestination`; `StagingFailed` when the directory
/// cannot be resolved.
pub fn guard_destination(dest_dir: &Path) -> Result<()> {
    let resolved = dest_dir
        .canonicalize()
        .map_err(|e| PublishError::StagingFailed {
            target: dest_dir.display().to_string(),
            message: format!("cannot resolve destination: {e}"),
        })?;

    let dangerous = DANGEROUS_DESTINATIONS
        .iter()
        .any(|d| resolved == Path::new(d));
    let is_home = std::env::var_os("HOME").is_some_and(|home| {
        let home = PathBuf::from(home);
        resolved == home.canonicalize().unwrap_or(home)
    });

    if dangerous || is_home || resolved.parent().is_none() {
        return Err(PublishError::DangerousDestination {
            path: resolved.display().to_string(),
        }
        .into());
    }
    Ok(())
}

struct StagedArtifact {
    artifact: Artifact,
    final_path: PathBuf,
    temp: NamedTempFile,
    digest: Hash,
    size: u64,
}

/// Copy artifact bytes into a temp file next to the final location,
/// hashing as we go, and force the data to durable storage.
async fn stage(artifact: &Artifact, dest_dir: &Path) -> Result<StagedArtifact> {
    let file_name = artifact.file_name();
    let final_path = dest_dir.join(&file_name);

    let temp = tempfile::Builder::new()
        .prefix(".wheelwright-tmp-")
        .tempfile_in(dest_dir)
        .map_err(|e| PublishError::StagingFailed {
            target: final_path.display().to_string(),
            message: format!("cannot create staging file: {e}"),
        })?;

    let reader = fs::File::open(&artifact.path)
        .await
        .map_err(|e| PublishError::StagingFailed {
            target: final_path.display().to_string(),
            message: format!("cannot open {}: {e}", artifact.path.display()),
        })?;
    let writer = fs::File::from_std(temp.as_file().try_clone().map_err(|e| {
        Error::from(PublishError::StagingFailed {
            target: final_path.display().to_string(),
            message: format!("cannot clone staging handle: {e}"),
        })
    })?);

    let (digest, size) =
        Hash::hash_and_copy(reader, writer)
            .await
            .map_err(|e| PublishError::StagingFailed {
                target: final_path.display().to_string(),
                message: e.to_string(),
            })?;

    temp.as_file()
        .sync_all()
        .map_err(|e| PublishError::StagingFailed {
            target: final_path.display().to_string(),
            message: format!("fsync failed: {e}"),
        })?;

    Ok(StagedArtifact {
        artifact: artifact.clone(),
        final_path,
        temp,
        digest,
        size,
    })
}

/// Publish one artifact atomically.
///
/// # Errors
///
/// Any failure before the rename removes the staging file and leaves the
/// destination untouched; the final path only ever appears complete.
pub async fn publish(artifact: &Artifact, dest_dir: &Path) -> Result<PublishedArtifact> {
    let mut published = publish_all(std::slice::from_ref(artifact), dest_dir).await?;
    Ok(published.remove(0))
}

/// Publish a validated batch all-or-nothing.
///
/// Every artifact is staged before the first rename; a rename failure rolls
/// back artifacts already promoted in this batch, restoring the
/// destination's pre-build state.
///
/// # Errors
///
/// Fails with `DangerousDestination`, `StagingFailed`, `RenameFailed`, or
/// `VerifyFailed`.
pub async fn publish_all(
    artifacts: &[Artifact],
    dest_dir: &Path,
) -> Result<Vec<PublishedArtifact>> {
    guard_destination(dest_dir)?;

    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        staged.push(stage(artifact, dest_dir).await?);
    }

    // Point of no return: promote each staged file with an atomic rename.
    let mut promoted: Vec<PublishedArtifact> = Vec::with_capacity(staged.len());
    for entry in staged {
        match entry.temp.persist(&entry.final_path) {
            Ok(_) => promoted.push(PublishedArtifact {
                kind: entry.artifact.kind,
                path: entry.final_path,
                digest: entry.digest.to_hex(),
                size: entry.size,
            }),
            Err(e) => {
                // Temp file is dropped (removed) by the error; roll back
                // what this batch already promoted.
                rollback(&promoted).await;
                return Err(PublishError::RenameFailed {
                    target: entry.final_path.display().to_string(),
                    message: e.error.to_string(),
                }
                .into());
            }
        }
    }

    // Last-line defense against corruption introduced during the copy
    for artifact in &promoted {
        if let Err(e) = validation::validate_archive(&artifact.path, artifact.kind).await {
            rollback(&promoted).await;
            return Err(PublishError::VerifyFailed {
                path: artifact.path.display().to_string(),
                message: e.to_string(),
            }
            .into());
        }
    }

    Ok(promoted)
}

async fn rollback(promoted: &[PublishedArtifact]) {
    for artifact in promoted {
        let _ = fs::remove_file(&artifact.path).await;
    }
}

/// Delete stale build products from a destination directory.
///
/// Only files matching `*.whl`, `*.tar.gz`, or `*.zip` directly inside the
/// directory are removed; the destination guard applies first.
///
/// # Errors
///
/// Fails with `DangerousDestination` or an I/O error; files that cannot be
/// deleted are reported after the sweep completes.
pub async fn clean_stale_artifacts(dest_dir: &Path) -> Result<usize> {
    guard_destination(dest_dir)?;

    let mut deleted = 0usize;
    let mut failures = Vec::new();
    let mut entries = fs::read_dir(dest_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, dest_dir))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, dest_dir))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !CLEANUP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            continue;
        }
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::io_with_path(&e, entry.path()))?;
        if !file_type.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => deleted += 1,
            Err(e) => failures.push(format!("{}: {e}", entry.path().display())),
        }
    }

    if failures.is_empty() {
        Ok(deleted)
    } else {
        Err(Error::internal(format!(
            "failed to delete some files during cleanup: {}",
            failures.join("; ")
        )))
    }
}
