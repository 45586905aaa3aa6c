use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;

const DEFAULT_WEATHER_API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Application configuration loaded from environment variables.
/// Fails at startup if the provider key is missing or a value is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub weather_api_key: String,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub weather_api_url: String,
    pub weather_location: String,
    pub weather_timeout: Option<Duration>,
    /// Local wall-clock time of the daily ingestion.
    pub ingest_at: NaiveTime,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            weather_api_key: require_env("OPENWEATHERMAP_KEY")?,
            database_url: optional_env("DATABASE_URL"),
            weather_api_url: optional_env("WEATHER_API_URL")
                .unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string()),
            weather_location: optional_env("WEATHER_LOCATION")
                .unwrap_or_else(|| "seoul".to_string()),
            weather_timeout: optional_env("WEATHER_TIMEOUT_SECS")
                .map(|v| {
                    v.parse::<u64>()
                        .map(Duration::from_secs)
                        .context("WEATHER_TIMEOUT_SECS must be a whole number of seconds")
                })
                .transpose()?,
            ingest_at: parse_ingest_time(
                &optional_env("INGEST_AT").unwrap_or_else(|| "01:00".to_string()),
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Empty values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// `HH:MM`, 24-hour.
pub fn parse_ingest_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("INGEST_AT must be HH:MM, got '{raw}'"))
}
