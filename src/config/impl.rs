use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::AppConfig;

static CONFIG: OnceLock<ArcSwap<AppConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults if `init_config`
/// was never called.
pub fn get_config() -> Arc<AppConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(AppConfig::default()))
        .load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from `path` (usually "config.toml") plus `GEO__*`
/// environment overrides. If the file doesn't exist, uses in-memory defaults.
pub fn init_config(path: &str) -> Arc<AppConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(AppConfig::load_from(path)))
        .load_full()
}
