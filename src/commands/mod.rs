//! Command implementations for lockstore.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the small helpers they share.

mod clean;
mod incr;
mod lock;
mod read;
mod set;
mod status;
mod write;

use crate::cli::Command;
use anyhow::{Context, Result};
use lockstore::StoreConfig;
use serde_json::Value;
use std::path::Path;

/// Dispatch a command to its implementation.
pub async fn dispatch(command: Command, config: &StoreConfig) -> Result<()> {
    match command {
        Command::Read(args) => read::cmd_read(args, config).await,
        Command::Write(args) => write::cmd_write(args, config).await,
        Command::Set(args) => set::cmd_set(args, config).await,
        Command::Incr(args) => incr::cmd_incr(args, config).await,
        Command::Status(args) => status::cmd_status(args, config).await,
        Command::Lock(args) => lock::cmd_lock(args, config).await,
        Command::Clean(args) => clean::cmd_clean(args, config).await,
    }
}

/// Load the store config from `--config`, or use defaults.
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    match path {
        Some(path) => Ok(StoreConfig::load(path)?),
        None => Ok(StoreConfig::default()),
    }
}

/// Parse a JSON argument, naming the argument in the error.
fn parse_json(what: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{} is not valid JSON: {}", what, text))
}

/// Render a document the way every command prints one.
fn print_document(doc: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(doc)?);
    Ok(())
}
