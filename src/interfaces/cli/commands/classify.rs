use colored::Colorize;

use crate::geo::GeoClassifier;
use crate::geo::classifier::normalize_country_code;
use crate::interfaces::cli::CliError;

pub fn classify(country_code: &str) -> Result<(), CliError> {
    let code = normalize_country_code(country_code);
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CliError::ParseError(format!(
            "\"{}\" is not a two-letter country code",
            country_code
        )));
    }

    let c = GeoClassifier::classify(&code);
    println!("{} {}", "Country:".bold(), code.cyan());
    println!("  {} {}", "region:".dimmed(), c.region.to_string().green());
    println!("  {} {}", "language:".dimmed(), c.language.as_ref());
    println!("  {} {}", "category:".dimmed(), c.region.category().as_ref());
    println!("  {} {}", "europe:".dimmed(), c.is_europe);
    Ok(())
}
