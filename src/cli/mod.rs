//! CLI argument parsing for lockstore.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Lockstore: transactional JSON documents shared between processes.
///
/// Every command takes the document's cross-process lock, so it is safe to
/// run any number of them against the same file at once.
#[derive(Parser, Debug)]
#[command(name = "lockstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// YAML file with store settings (timeouts, retries, thresholds).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands for lockstore.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a document as pretty JSON.
    ///
    /// Prints `null` for a missing document unless `--default` is given.
    Read(ReadArgs),

    /// Replace a document entirely.
    Write(WriteArgs),

    /// Set one top-level key, leaving the rest of the document alone.
    Set(SetArgs),

    /// Add to a numeric top-level key (a missing key counts as 0).
    Incr(IncrArgs),

    /// Show existence, size, modification time and lock state.
    Status(StatusArgs),

    /// Show who holds a document's lock.
    Lock(PathArgs),

    /// Remove leftovers from interrupted writes and stale locks.
    ///
    /// Dry-run by default; pass `--yes` to delete.
    Clean(CleanArgs),
}

/// Arguments for commands that only need a document path.
#[derive(Args, Debug)]
pub struct PathArgs {
    /// Path to the JSON document.
    pub path: PathBuf,
}

/// Arguments for the `read` command.
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Path to the JSON document.
    pub path: PathBuf,

    /// Default document (JSON); missing top-level keys are filled from it.
    #[arg(long, value_name = "JSON")]
    pub default: Option<String>,
}

/// Arguments for the `write` command.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Path to the JSON document.
    pub path: PathBuf,

    /// New document as JSON, or `-` to read it from stdin.
    pub content: String,
}

/// Arguments for the `set` command.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Path to the JSON document.
    pub path: PathBuf,

    /// Top-level key to set.
    pub key: String,

    /// Value as JSON (e.g. `42`, `"text"`, `[1,2]`).
    pub value: String,
}

/// Arguments for the `incr` command.
#[derive(Args, Debug)]
pub struct IncrArgs {
    /// Path to the JSON document.
    pub path: PathBuf,

    /// Top-level numeric key.
    pub key: String,

    /// Amount to add.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub by: i64,
}

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the JSON document.
    pub path: PathBuf,

    /// Print machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `clean` command.
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Path to the JSON document.
    pub path: PathBuf,

    /// Actually delete (default is dry-run).
    #[arg(short, long)]
    pub yes: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
