use actix_web::http::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::errors::{GeoRouterError, Result};
use crate::geo::Region;

/// Upper bound for either cache tier's TTL (30 days)
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Upper bound for the pause between upstream attempts
pub const MAX_RETRY_BACKOFF_MS: u64 = 5000;

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：GEO，分隔符：__
    /// 示例：GEO__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn try_load_from(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("GEO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the resolution layer cannot honour
    pub fn validate(&self) -> Result<()> {
        let geoip = &self.geoip;
        if !(1000..=10_000).contains(&geoip.timeout_ms) {
            return Err(GeoRouterError::config(format!(
                "geoip.timeout_ms must be within 1000..=10000, got {}",
                geoip.timeout_ms
            )));
        }
        if geoip.max_attempts == 0 || geoip.max_attempts > 5 {
            return Err(GeoRouterError::config(format!(
                "geoip.max_attempts must be within 1..=5, got {}",
                geoip.max_attempts
            )));
        }
        if !geoip.api_url.contains("{ip}") {
            return Err(GeoRouterError::config(
                "geoip.api_url must contain the {ip} placeholder",
            ));
        }
        url::Url::parse(&geoip.api_url.replace("{ip}", "0.0.0.0")).map_err(|e| {
            GeoRouterError::config(format!("geoip.api_url is not a valid URL: {}", e))
        })?;

        if geoip.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(GeoRouterError::config(format!(
                "geoip.retry_backoff_ms must be at most {}, got {}",
                MAX_RETRY_BACKOFF_MS, geoip.retry_backoff_ms
            )));
        }

        for (name, ttl) in [
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("cache.client_ttl_secs", self.cache.client_ttl_secs),
        ] {
            if !(1..=MAX_CACHE_TTL_SECS).contains(&ttl) {
                return Err(GeoRouterError::config(format!(
                    "{} must be within 1..={}, got {}",
                    name, MAX_CACHE_TTL_SECS, ttl
                )));
            }
        }
        if !matches!(self.cache.backend.as_str(), "moka" | "memory") {
            return Err(GeoRouterError::config(format!(
                "cache.backend must be \"moka\" or \"memory\", got \"{}\"",
                self.cache.backend
            )));
        }

        self.routing.designated_region()?;
        self.routing.trusted_country_header()?;
        if let Some(host) = self.routing.alternate_host() {
            url::Url::parse(&format!("https://{}/", host)).map_err(|e| {
                GeoRouterError::config(format!("routing.alternate_host is invalid: {}", e))
            })?;
        }
        if let Some(bad) = self
            .routing
            .bypass_prefixes
            .iter()
            .find(|p| !p.starts_with('/'))
        {
            return Err(GeoRouterError::config(format!(
                "routing.bypass_prefixes entries must start with '/', got \"{}\"",
                bad
            )));
        }

        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GeoRouterError::serialization(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// Upstream geolocation API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// `{ip}` is replaced with the client address
    #[serde(default = "default_geoip_api_url")]
    pub api_url: String,
    #[serde(default = "default_geoip_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geoip_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_geoip_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_geoip_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// 缓存系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// "moka" (bounded) or "memory"
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_client_ttl")]
    pub client_ttl_secs: u64,
    #[serde(default = "default_client_namespace")]
    pub client_namespace: String,
    #[serde(default = "default_client_dir")]
    pub client_dir: String,
}

/// Regional redirect policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Host of the alternate regional deployment; unset or empty disables redirects
    #[serde(default)]
    pub alternate_host: Option<String>,
    #[serde(default = "default_designated_region")]
    pub designated_region: String,
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,
    /// Header carrying a country code set by the edge platform (e.g.
    /// `cf-ipcountry`); when present it replaces the IP lookup. Only set this
    /// behind a proxy that overwrites the header.
    #[serde(default)]
    pub trusted_country_header: Option<String>,
}

impl RoutingConfig {
    pub fn alternate_host(&self) -> Option<&str> {
        self.alternate_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    pub fn trusted_country_header(&self) -> Result<Option<HeaderName>> {
        let Some(name) = self
            .trusted_country_header
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
        else {
            return Ok(None);
        };
        HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map(Some)
            .map_err(|_| {
                GeoRouterError::config(format!(
                    "routing.trusted_country_header \"{}\" is not a valid header name",
                    name
                ))
            })
    }

    pub fn designated_region(&self) -> Result<Region> {
        self.designated_region.parse::<Region>().map_err(|_| {
            GeoRouterError::config(format!(
                "routing.designated_region \"{}\" is not a known region",
                self.designated_region
            ))
        })
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_geoip_api_url() -> String {
    "https://ipapi.co/{ip}/json/".to_string()
}

fn default_geoip_user_agent() -> String {
    format!("georouter/{}", env!("CARGO_PKG_VERSION"))
}

fn default_geoip_timeout_ms() -> u64 {
    3000
}

fn default_geoip_max_attempts() -> u32 {
    2
}

fn default_geoip_retry_backoff_ms() -> u64 {
    500
}

fn default_cache_backend() -> String {
    "moka".to_string()
}

fn default_cache_ttl() -> u64 {
    30 * 60
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_client_ttl() -> u64 {
    24 * 60 * 60
}

fn default_client_namespace() -> String {
    "georouter_geo_cache".to_string()
}

fn default_client_dir() -> String {
    ".georouter".to_string()
}

fn default_designated_region() -> String {
    "china".to_string()
}

fn default_bypass_prefixes() -> Vec<String> {
    [
        "/auth/callback",
        "/auth/reset-password",
        "/auth/verify",
        "/login",
        "/register",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            api_url: default_geoip_api_url(),
            user_agent: default_geoip_user_agent(),
            timeout_ms: default_geoip_timeout_ms(),
            max_attempts: default_geoip_max_attempts(),
            retry_backoff_ms: default_geoip_retry_backoff_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            ttl_secs: default_cache_ttl(),
            max_capacity: default_cache_capacity(),
            client_ttl_secs: default_client_ttl(),
            client_namespace: default_client_namespace(),
            client_dir: default_client_dir(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            alternate_host: None,
            designated_region: default_designated_region(),
            bypass_prefixes: default_bypass_prefixes(),
            trusted_country_header: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
