//! CLI interface module
//!
//! This module provides command-line interface functionality for georouter.

pub mod commands;

use crate::cli::{Commands, ConfigCommands};
use crate::config::AppConfig;
use commands::{check_config, classify, config_generate, detect, resolve};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    ConfigError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::ConfigError(msg) => format!("Config error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::ConfigError(msg) => {
                format!("{} {}", "Config error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::GeoRouterError> for CliError {
    fn from(err: crate::errors::GeoRouterError) -> Self {
        match err {
            crate::errors::GeoRouterError::Config(msg) => CliError::ConfigError(msg),
            other => CliError::CommandError(other.format_simple()),
        }
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands, config: &AppConfig) -> Result<(), CliError> {
    match cmd {
        Commands::Classify { country_code } => classify(&country_code),

        Commands::Resolve { ip, json } => resolve(config, &ip, json).await,

        Commands::Detect {
            server,
            refresh,
            clear,
        } => detect(config, server, refresh, clear).await,

        Commands::Config { action } => match action {
            ConfigCommands::Generate { output, force } => config_generate(output, force),
            ConfigCommands::Check => check_config(config),
        },

        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by server mode".to_string(),
        )),
    }
}
