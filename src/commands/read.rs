//! Implementation of the `lockstore read` command.

use super::{parse_json, print_document};
use crate::cli::ReadArgs;
use anyhow::Result;
use lockstore::{DocumentStore, StoreConfig, TransactionalStore};
use serde_json::Value;

/// Print the document.
///
/// Without `--default` this is a strict read: errors propagate and a missing
/// document prints `null`. With `--default` read failures fall back to the
/// default and missing keys are filled in from it.
pub async fn cmd_read(args: ReadArgs, config: &StoreConfig) -> Result<()> {
    let doc = match args.default {
        Some(default) => {
            let default = parse_json("--default", &default)?;
            DocumentStore::new(&args.path, config.clone(), default)?
                .read()
                .await
        }
        None => TransactionalStore::new(&args.path, config.clone())?
            .read()
            .await?
            .unwrap_or(Value::Null),
    };

    print_document(&doc)
}
