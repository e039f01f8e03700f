use clap::Parser;
use colored::Colorize;

use georouter::cli::Cli;
use georouter::config::init_config;
use georouter::runtime::modes::{self, Mode};
use georouter::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = init_config(&cli.config);

    match modes::detect_mode(cli.command.as_ref()) {
        #[cfg(feature = "server")]
        Mode::Server => {
            let _guard = init_logging(&config.logging)?;
            modes::run_server().await
        }
        #[cfg(feature = "cli")]
        Mode::Cli => {
            let Some(command) = cli.command else {
                return Ok(());
            };
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Unknown => {
            eprintln!(
                "{}",
                "No execution mode available; build with the `server` or `cli` feature".red()
            );
            std::process::exit(2);
        }
    }
}
