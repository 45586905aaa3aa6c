use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Config;
use crate::weather::{WeatherError, WeatherSource};

/// HTTP client for the provider's current-weather endpoint.
///
/// Always queries the same location with the same API key. No timeout is set
/// unless one is configured, so a hung connection blocks the calling task.
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    location: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(
        base_url: impl Into<String>,
        location: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, WeatherError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
            location: location.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        Self::new(
            config.weather_api_url.clone(),
            config.weather_location.clone(),
            config.weather_api_key.clone(),
            config.weather_timeout,
        )
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    /// GET `<base>?q=<location>&appid=<key>`, returning the body text.
    async fn fetch_current(&self) -> Result<String, WeatherError> {
        // The request URL carries the API key; strip it from any error.
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", self.location.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Transport(e.without_url()))?;

        if status.is_success() {
            debug!(bytes = body.len(), "Fetched current weather for {}", self.location);
        } else {
            warn!("Weather provider returned {status} for {}", self.location);
        }

        Ok(body)
    }
}
