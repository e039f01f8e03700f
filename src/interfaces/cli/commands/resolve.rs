use std::sync::Arc;

use colored::Colorize;

use crate::cache::MemoryGeoCache;
use crate::config::AppConfig;
use crate::interfaces::cli::CliError;
use crate::runtime::lifetime::startup::build_resolver;

/// One-shot resolution through the configured upstream, no shared cache
pub async fn resolve(config: &AppConfig, ip: &str, json: bool) -> Result<(), CliError> {
    let cache = Arc::new(MemoryGeoCache::new(config.cache.ttl_secs));
    let resolver = build_resolver(&config.geoip, cache);
    let resolution = resolver.resolve(ip).await;

    if json {
        let out = serde_json::to_string_pretty(&resolution.record)
            .map_err(|e| CliError::CommandError(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    let record = &resolution.record;
    let header = if resolution.degraded {
        "Resolved (degraded):".yellow().bold()
    } else {
        "Resolved:".green().bold()
    };
    println!("{} {}", header, ip.cyan());
    println!(
        "  {} {} {}",
        "country:".dimmed(),
        record.country_code(),
        record.country_name()
    );
    println!("  {} {}", "region:".dimmed(), record.region());
    println!("  {} {}", "language:".dimmed(), record.language().as_ref());
    if let Some(city) = record.city() {
        println!("  {} {}", "city:".dimmed(), city);
    }
    println!("  {} {}", "source:".dimmed(), resolution.source.as_ref());
    if let Some(reason) = resolution.reason {
        println!("  {} {}", "reason:".dimmed(), reason.to_string().yellow());
    }
    Ok(())
}
