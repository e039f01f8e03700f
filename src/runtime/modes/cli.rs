//! CLI mode
//!
//! This module contains the CLI mode startup logic.
//! It delegates to the actual CLI implementation.

use crate::cli::Commands;
use crate::config::get_config;
use crate::interfaces::cli::CliError;

/// Run CLI mode
pub async fn run_cli(cmd: Commands) -> Result<(), CliError> {
    let config = get_config();
    crate::interfaces::cli::run_cli_command(cmd, &config).await
}
