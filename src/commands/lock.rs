//! Implementation of the `lockstore lock` command.

use crate::cli::PathArgs;
use anyhow::Result;
use lockstore::StoreConfig;
use lockstore::locks;

/// Show the current holder of the document's lock, if any.
pub async fn cmd_lock(args: PathArgs, config: &StoreConfig) -> Result<()> {
    match locks::inspect(&args.path, config.stale_threshold()).await? {
        Some(info) => {
            println!("Locked: {}", info);
            if info.is_stale {
                println!();
                println!("The holder stopped heartbeating; the next writer will take over.");
                println!("Run `lockstore clean {} --yes` to remove it now.", args.path.display());
            }
        }
        None => println!("Not locked: {}", args.path.display()),
    }
    Ok(())
}
