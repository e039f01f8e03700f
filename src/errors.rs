use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// Why a resolution degraded.
///
/// Carried on [`crate::services::Resolution`] so callers can log or surface
/// degradation without ever seeing an `Err`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    UpstreamTimeout,
    UpstreamHttpError,
    UpstreamApplicationError,
    UpstreamTransport,
    CacheCorrupt,
    InvalidAddress,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone)]
pub enum GeoRouterError {
    UpstreamTimeout(String),
    UpstreamHttp(String),
    UpstreamApplication(String),
    UpstreamTransport(String),
    CacheCorrupt(String),
    InvalidAddress(String),
    Config(String),
    FileOperation(String),
    Serialization(String),
    Client(String),
}

impl GeoRouterError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GeoRouterError::UpstreamTimeout(_) => "E001",
            GeoRouterError::UpstreamHttp(_) => "E002",
            GeoRouterError::UpstreamApplication(_) => "E003",
            GeoRouterError::UpstreamTransport(_) => "E004",
            GeoRouterError::CacheCorrupt(_) => "E005",
            GeoRouterError::InvalidAddress(_) => "E006",
            GeoRouterError::Config(_) => "E007",
            GeoRouterError::FileOperation(_) => "E008",
            GeoRouterError::Serialization(_) => "E009",
            GeoRouterError::Client(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeoRouterError::UpstreamTimeout(_) => "Upstream Timeout",
            GeoRouterError::UpstreamHttp(_) => "Upstream HTTP Error",
            GeoRouterError::UpstreamApplication(_) => "Upstream Application Error",
            GeoRouterError::UpstreamTransport(_) => "Upstream Transport Error",
            GeoRouterError::CacheCorrupt(_) => "Cache Corrupt",
            GeoRouterError::InvalidAddress(_) => "Invalid Address",
            GeoRouterError::Config(_) => "Configuration Error",
            GeoRouterError::FileOperation(_) => "File Operation Error",
            GeoRouterError::Serialization(_) => "Serialization Error",
            GeoRouterError::Client(_) => "Client Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GeoRouterError::UpstreamTimeout(msg)
            | GeoRouterError::UpstreamHttp(msg)
            | GeoRouterError::UpstreamApplication(msg)
            | GeoRouterError::UpstreamTransport(msg)
            | GeoRouterError::CacheCorrupt(msg)
            | GeoRouterError::InvalidAddress(msg)
            | GeoRouterError::Config(msg)
            | GeoRouterError::FileOperation(msg)
            | GeoRouterError::Serialization(msg)
            | GeoRouterError::Client(msg) => msg,
        }
    }

    /// Degradation kind for errors that the resolution layer recovers from.
    ///
    /// Ambient errors (config, IO, client) have no kind and never reach a
    /// resolution.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            GeoRouterError::UpstreamTimeout(_) => Some(ErrorKind::UpstreamTimeout),
            GeoRouterError::UpstreamHttp(_) => Some(ErrorKind::UpstreamHttpError),
            GeoRouterError::UpstreamApplication(_) => Some(ErrorKind::UpstreamApplicationError),
            GeoRouterError::UpstreamTransport(_) => Some(ErrorKind::UpstreamTransport),
            GeoRouterError::CacheCorrupt(_) => Some(ErrorKind::CacheCorrupt),
            GeoRouterError::InvalidAddress(_) => Some(ErrorKind::InvalidAddress),
            _ => None,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GeoRouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeoRouterError {}

// 便捷的构造函数
impl GeoRouterError {
    pub fn upstream_timeout<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::UpstreamTimeout(msg.into())
    }

    pub fn upstream_http<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::UpstreamHttp(msg.into())
    }

    pub fn upstream_application<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::UpstreamApplication(msg.into())
    }

    pub fn upstream_transport<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::UpstreamTransport(msg.into())
    }

    pub fn cache_corrupt<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::CacheCorrupt(msg.into())
    }

    pub fn invalid_address<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::InvalidAddress(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::Config(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::Serialization(msg.into())
    }

    pub fn client<T: Into<String>>(msg: T) -> Self {
        GeoRouterError::Client(msg.into())
    }
}

impl From<std::io::Error> for GeoRouterError {
    fn from(err: std::io::Error) -> Self {
        GeoRouterError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for GeoRouterError {
    fn from(err: serde_json::Error) -> Self {
        GeoRouterError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for GeoRouterError {
    fn from(err: config::ConfigError) -> Self {
        GeoRouterError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoRouterError>;
