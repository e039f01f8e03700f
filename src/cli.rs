//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for georouter using clap's derive macros.

use clap::{Parser, Subcommand};

/// georouter - geo-aware routing edge and regional resolver
#[derive(Parser)]
#[command(name = "georouter")]
#[command(version)]
#[command(about = "Geo-aware routing edge and regional client resolver", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve,

    /// Classify a country code into region, language and Europe flag
    Classify {
        /// ISO 3166-1 alpha-2 country code (e.g. CN, fr)
        country_code: String,
    },

    /// Resolve an IP address through the configured upstream
    Resolve {
        /// IPv4 or IPv6 address
        ip: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a running server for this machine's location
    Detect {
        /// Server base URL (default: from server.host / server.port)
        #[arg(long)]
        server: Option<String>,

        /// Drop the persisted location and detect again
        #[arg(long)]
        refresh: bool,

        /// Only clear the persisted location
        #[arg(long, conflicts_with = "refresh")]
        clear: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml, `-` for stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },

    /// Validate the loaded configuration
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_means_server() {
        let cli = Cli::try_parse_from(["georouter"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "config.toml");
    }

    #[test]
    fn test_parse_detect() {
        let cli = Cli::try_parse_from([
            "georouter",
            "detect",
            "--server",
            "http://localhost:9000",
            "--refresh",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Detect {
                server,
                refresh,
                clear,
            }) => {
                assert_eq!(server.as_deref(), Some("http://localhost:9000"));
                assert!(refresh);
                assert!(!clear);
            }
            _ => panic!("expected detect"),
        }
    }

    #[test]
    fn test_refresh_conflicts_with_clear() {
        assert!(Cli::try_parse_from(["georouter", "detect", "--refresh", "--clear"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["georouter", "classify", "cn", "--config", "/etc/geo.toml"])
                .unwrap();
        assert_eq!(cli.config, "/etc/geo.toml");
        assert!(matches!(cli.command, Some(Commands::Classify { .. })));
    }
}
