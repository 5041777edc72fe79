//! Implementation of the `lockstore write` command.

use super::parse_json;
use crate::cli::WriteArgs;
use anyhow::{Context, Result};
use lockstore::{StoreConfig, TransactionalStore};
use tokio::io::AsyncReadExt;

/// Replace the document with the given JSON (`-` reads stdin).
pub async fn cmd_write(args: WriteArgs, config: &StoreConfig) -> Result<()> {
    let text = if args.content == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read document from stdin")?;
        buf
    } else {
        args.content
    };
    let doc = parse_json("document", text.trim())?;

    let store = TransactionalStore::new(&args.path, config.clone())?;
    store.write(&doc).await?;

    println!("Wrote {}", args.path.display());
    Ok(())
}
