//! Lockstore: transactional JSON documents shared between processes.
//!
//! This is the main entry point for the `lockstore` CLI. It parses arguments,
//! sets up logging, dispatches to the appropriate command handler, and maps
//! errors to exit codes.

mod cli;
mod commands;
mod logging;

use cli::Cli;
use lockstore::StoreError;
use lockstore::exit_codes;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.global.verbose);

    let result = match commands::load_config(cli.global.config.as_deref()) {
        Ok(config) => commands::dispatch(cli.command, &config).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err) as u8)
        }
    }
}

/// Exit code of the first library error in the chain; anything else is a usage error.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .map(StoreError::exit_code)
        .unwrap_or(exit_codes::USER_ERROR)
}
