//! Centralized configuration for the shortener CLI.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than halfway through a command.

use std::env;
use std::path::PathBuf;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost when the process exits)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ConfigError {
                field: "STORAGE_PROVIDER",
                message: format!("expected 'sqlite' or 'memory', got '{}'", s),
            }),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError {
                field: "LOG_FORMAT",
                message: format!("expected 'pretty' or 'json', got '{}'", s),
            }),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[error("Configuration error for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// CLI configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage provider (default: sqlite)
    pub storage_provider: StorageProvider,
    /// SQLite database path (default: ./data/shortlinks.db)
    pub db_path: PathBuf,
    /// Log format
    pub log_format: LogFormat,
    /// Origin short URLs are served from; also recorded as click location
    pub origin: String,
    /// Validity used when a command does not pass one (default: 30)
    pub default_validity_minutes: i64,
    /// Seconds between refreshes of `stats --watch` (default: 30)
    pub stats_refresh_secs: u64,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Storage provider
        let storage_provider =
            StorageProvider::parse(&lookup("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()))?;

        // DB path (for sqlite)
        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/shortlinks.db"));

        // Log format
        let log_format =
            LogFormat::parse(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()))?;

        // Shortlink origin
        let origin = lookup("SHORTLINK_ORIGIN")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "http://localhost:3000".into());
        if !domain::validate::is_valid_url(&origin) {
            return Err(ConfigError {
                field: "SHORTLINK_ORIGIN",
                message: format!("'{}' is not an absolute URL", origin),
            });
        }
        let origin = origin.trim_end_matches('/').to_string();

        // Default validity
        let default_validity_minutes = parse_positive(&lookup, "DEFAULT_VALIDITY_MINUTES", 30)?;

        // Stats refresh interval
        let stats_refresh_secs = parse_positive(&lookup, "STATS_REFRESH_SECS", 30)?;

        Ok(Self {
            storage_provider,
            db_path,
            log_format,
            origin,
            default_validity_minutes,
            stats_refresh_secs: stats_refresh_secs as u64,
        })
    }
}

fn parse_positive<F>(lookup: &F, field: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(field).filter(|s| !s.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError {
            field,
            message: format!("expected a positive integer, got '{}'", raw),
        }),
    }
}
