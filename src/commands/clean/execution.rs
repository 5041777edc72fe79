//! Cleanup execution logic.

use super::types::{CleanupPlan, CleanupResult};
use lockstore::config::StoreConfig;
use lockstore::error::Result;
use lockstore::fs::remove_orphan_temp_files;
use lockstore::locks::{self, lock_path_for};
use std::path::Path;

/// Remove what the plan lists.
///
/// Every candidate is re-checked at removal time: a temp file or lock that
/// has become live again since planning is skipped, not deleted.
pub async fn execute_cleanup(
    path: &Path,
    config: &StoreConfig,
    plan: &CleanupPlan,
) -> Result<CleanupResult> {
    let mut result = CleanupResult::default();
    let min_age = config.stale_threshold();

    if !plan.orphan_temp_files.is_empty() {
        let removed = remove_orphan_temp_files(path, min_age).await?;
        for temp in &plan.orphan_temp_files {
            if removed.contains(&temp.path) {
                println!("Removed: {}", temp.path.display());
            } else {
                result
                    .skipped
                    .push((temp.path.clone(), "no longer removable".to_string()));
            }
        }
        result.removed_count += removed.len();
    }

    if plan.stale_lock.is_some() {
        let lock_path = lock_path_for(path);
        if locks::clear_stale(path, min_age).await? {
            println!("Removed: {}", lock_path.display());
            result.removed_count += 1;
        } else {
            result
                .skipped
                .push((lock_path, "lock is live again or already gone".to_string()));
        }
    }

    Ok(result)
}
