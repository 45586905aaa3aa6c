//! Outbound weather lookups: the provider client and the parser for its
//! current-conditions payload.
//!
//! Transport failures and malformed payloads are distinct errors. A caller
//! never has to sniff a response body to learn that the network call failed.

use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod parser;

pub use client::WeatherClient;
pub use parser::parse_weather;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unreadable weather payload: {0}")]
    Parse(String),
}

/// Anything that can hand back the provider's raw current-conditions body.
///
/// Non-2xx responses whose body could be read are `Ok`: the provider sends
/// JSON error bodies and the parser decides what to do with them.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_current(&self) -> Result<String, WeatherError>;
}
