//! Cleanup planning: find what can be removed safely.

use super::types::CleanupPlan;
use lockstore::config::StoreConfig;
use lockstore::error::Result;
use lockstore::fs::find_orphan_temp_files;
use lockstore::locks;
use std::path::Path;

/// Inspect the artifacts around `path` without touching anything.
///
/// Temp files younger than the stale threshold may still be in use and are
/// reported separately. A lock marker is a candidate only if it is stale.
pub async fn build_cleanup_plan(path: &Path, config: &StoreConfig) -> Result<CleanupPlan> {
    let min_age = config.stale_threshold();

    let (orphan_temp_files, recent_temp_files) = find_orphan_temp_files(path)
        .await?
        .into_iter()
        .partition(|temp| temp.age >= min_age);

    let stale_lock = locks::inspect(path, min_age)
        .await?
        .filter(|info| info.is_stale);

    Ok(CleanupPlan {
        orphan_temp_files,
        recent_temp_files,
        stale_lock,
    })
}
