//! Implementation of the `lockstore status` command.

use crate::cli::StatusArgs;
use anyhow::Result;
use lockstore::{StoreConfig, TransactionalStore};

/// Print what is known about the document without reading it.
pub async fn cmd_status(args: StatusArgs, config: &StoreConfig) -> Result<()> {
    let store = TransactionalStore::new(&args.path, config.clone())?;
    let status = store.status().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{}", status);
    }
    Ok(())
}
