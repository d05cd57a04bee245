// Runtime configuration loaded from the environment (after dotenv)

use chrono::{Datelike, Utc};

use crate::achievements::TargetSummation;

/// Errors raised while reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string; in-memory stores are used when absent
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// Year whose twelve months are always present in the monthly trend
    pub trend_year: i32,
    pub target_summation: TargetSummation,
}

impl AppConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8080u16)?;
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 5u32)?;
        let trend_year = parse_or("TREND_YEAR", lookup("TREND_YEAR"), Utc::now().year())?;

        let target_summation = match lookup("TARGET_SUMMATION") {
            Some(value) => value
                .parse::<TargetSummation>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "TARGET_SUMMATION",
                    value,
                })?,
            None => TargetSummation::default(),
        };

        Ok(Self {
            database_url,
            host,
            port,
            db_max_connections,
            trend_year,
            target_summation,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}
