use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::weather::Weather;

/// A diary note for a calendar date with a copy of the weather resolved
/// when it was written. Only `text` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DiaryEntry {
    /// `None` until the store has assigned an identity.
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub text: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub weather: Weather,
}

impl DiaryEntry {
    pub fn new(date: NaiveDate, text: impl Into<String>, weather: Weather) -> Self {
        Self {
            id: None,
            date,
            text: text.into(),
            weather,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}
