use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{Weather, WeatherRecord};
use crate::weather::WeatherError;

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    main: MainBlock,
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
    icon: String,
}

/// Shape of the provider's error bodies, e.g. `{"cod":401,"message":"..."}`.
#[derive(Debug, Deserialize)]
struct ProviderFault {
    message: String,
}

/// Parses `{main:{temp}, weather:[{main, icon}, ..]}` into a record dated `date`.
/// Only the first `weather` element is used.
pub fn parse_weather(raw: &str, date: NaiveDate) -> Result<WeatherRecord, WeatherError> {
    let conditions: CurrentConditions = serde_json::from_str(raw).map_err(|e| {
        match serde_json::from_str::<ProviderFault>(raw) {
            Ok(fault) => WeatherError::Parse(format!("provider error: {}", fault.message)),
            Err(_) => WeatherError::Parse(e.to_string()),
        }
    })?;

    let first = conditions
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Parse("`weather` array is empty".to_string()))?;

    Ok(WeatherRecord::new(
        date,
        Weather {
            condition: first.main,
            icon: first.icon,
            temperature: conditions.main.temp,
        },
    ))
}
