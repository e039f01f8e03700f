use colored::Colorize;

use crate::client::{GeoClient, LocationSource};
use crate::config::AppConfig;
use crate::interfaces::cli::CliError;

pub async fn detect(
    config: &AppConfig,
    server: Option<String>,
    refresh: bool,
    clear: bool,
) -> Result<(), CliError> {
    let server = server.unwrap_or_else(|| {
        format!("http://{}:{}", config.server.host, config.server.port)
    });
    let client = GeoClient::from_config(&server, config);

    if clear {
        client.clear_cache()?;
        println!("{}", "Persisted location cleared".green());
        return Ok(());
    }

    let location = if refresh {
        client.refresh().await?
    } else {
        client.location().await?
    };

    let source = match location.source {
        LocationSource::Cache => "cache",
        LocationSource::Server => "server",
        LocationSource::Stale => "stale cache",
    };
    let record = &location.record;
    println!(
        "{} {} ({}) {}",
        "Location:".bold(),
        record.country_code().cyan(),
        record.region(),
        format!("[{}]", source).dimmed()
    );
    if location.degraded {
        println!("  {}", "server answered with a fallback location".yellow());
    }
    Ok(())
}
