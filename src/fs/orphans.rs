//! Leftover temp artifacts.
//!
//! A temp artifact that outlives its write means the writer crashed between
//! staging and rename. It never holds committed data, so it is safe to
//! delete once it is old enough not to belong to a write still in flight.

use super::atomic::TEMP_SUFFIX;
use crate::error::{Result, StoreError};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{info, warn};

/// A temp artifact found next to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanTempFile {
    pub path: PathBuf,
    pub size: u64,
    pub age: Duration,
}

/// Matches exactly `<document>.<instance>.<seq>.tmp`.
fn is_temp_artifact_of(document_name: &str, candidate: &str) -> bool {
    let Some(rest) = candidate
        .strip_prefix(document_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(TEMP_SUFFIX))
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };
    let Some((instance, seq)) = rest.split_once('.') else {
        return false;
    };

    !instance.is_empty() && !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit())
}

/// List the temp artifacts of `path`, oldest first.
pub async fn find_orphan_temp_files(path: &Path) -> Result<Vec<OrphanTempFile>> {
    let Some(document_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(StoreError::Config(format!(
            "invalid document path '{}'",
            path.display()
        )));
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::io(
                format!("failed to read directory '{}'", dir.display()),
                e,
            ));
        }
    };

    let now = SystemTime::now();
    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io("failed to read directory entry", e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_temp_artifact_of(document_name, name) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        found.push(OrphanTempFile {
            path: entry.path(),
            size: meta.len(),
            age,
        });
    }

    found.sort_by(|a, b| b.age.cmp(&a.age));
    Ok(found)
}

/// Delete temp artifacts of `path` older than `min_age`.
///
/// Returns the removed paths. Individual removal failures are logged and
/// skipped.
pub async fn remove_orphan_temp_files(path: &Path, min_age: Duration) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for orphan in find_orphan_temp_files(path).await? {
        if orphan.age < min_age {
            continue;
        }
        match fs::remove_file(&orphan.path).await {
            Ok(()) => {
                info!(path = %orphan.path.display(), "removed orphan temp file");
                removed.push(orphan.path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %orphan.path.display(),
                error = %e,
                "failed to remove orphan temp file"
            ),
        }
    }
    Ok(removed)
}
