use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Conditions reported by the provider: short label, icon code, temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Weather {
    #[sqlx(rename = "weather")]
    #[serde(rename = "weather")]
    pub condition: String,
    pub icon: String,
    /// Provider units (Kelvin for the default OpenWeatherMap endpoint).
    pub temperature: f64,
}

/// A weather snapshot the system believes held for `date`.
/// Immutable once created; the cache may hold several per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub weather: Weather,
}

impl WeatherRecord {
    pub fn new(date: NaiveDate, weather: Weather) -> Self {
        Self { date, weather }
    }
}
