//! Display and formatting utilities for clean command output.

use super::types::CleanupPlan;
use lockstore::locks::age_string;
use lockstore::store::format_size;

/// Print the cleanup plan in a readable format.
pub fn print_cleanup_plan(plan: &CleanupPlan) {
    println!("Cleanup plan:");
    println!();

    if !plan.orphan_temp_files.is_empty() {
        println!(
            "Temp files from interrupted writes ({}):",
            plan.orphan_temp_files.len()
        );
        for temp in &plan.orphan_temp_files {
            println!(
                "  - {} ({}, {} old)",
                temp.path.display(),
                format_size(temp.size),
                age_string(temp.age)
            );
        }
        println!();
    }

    if let Some(info) = &plan.stale_lock {
        println!("Stale lock:");
        println!("  - {}", info);
        println!();
    }

    print_recent_temp_files(plan);
}

/// Mention temp files that are left alone because they may be in use.
pub fn print_recent_temp_files(plan: &CleanupPlan) {
    if plan.recent_temp_files.is_empty() {
        return;
    }
    println!(
        "Keeping {} recent temp file(s) that may belong to a write in progress.",
        plan.recent_temp_files.len()
    );
}
