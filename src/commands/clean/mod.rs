//! Implementation of the `lockstore clean` command.
//!
//! Removes what crashed writers leave next to a document:
//! - Temp files (`<file>.<instance>.<seq>.tmp`) from writes that never
//!   reached the rename
//! - A lock marker whose holder stopped heartbeating
//!
//! # Safety
//!
//! - Default behavior is dry-run (prints what would be removed)
//! - Requires `--yes` to actually perform deletions
//! - Temp files younger than the stale threshold are never removed
//! - A lock is removed only if it is still stale when re-checked under the
//!   lock gate
//! - The document and its backup are never touched

mod display;
mod execution;
mod planning;
mod types;

#[cfg(test)]
mod tests;

use crate::cli::CleanArgs;
use lockstore::StoreConfig;
use anyhow::Result;

use display::{print_cleanup_plan, print_recent_temp_files};
use execution::execute_cleanup;
use planning::build_cleanup_plan;

/// Execute the `lockstore clean` command.
pub async fn cmd_clean(args: CleanArgs, config: &StoreConfig) -> Result<()> {
    let plan = build_cleanup_plan(&args.path, config).await?;

    if plan.candidate_count() == 0 {
        println!("No cleanup candidates found.");
        print_recent_temp_files(&plan);
        return Ok(());
    }

    print_cleanup_plan(&plan);

    if !args.yes {
        println!();
        println!("Dry-run mode: no changes made.");
        println!("Run with --yes to perform the cleanup.");
        return Ok(());
    }

    let result = execute_cleanup(&args.path, config, &plan).await?;

    println!();
    println!("Cleanup complete:");
    println!("  Removed: {} item(s)", result.removed_count);
    if !result.skipped.is_empty() {
        println!("  Skipped: {} item(s)", result.skipped.len());
        for (path, reason) in &result.skipped {
            println!("    - {}: {}", path.display(), reason);
        }
    }

    Ok(())
}
