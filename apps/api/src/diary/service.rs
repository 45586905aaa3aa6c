//! Diary orchestration: weather resolution (cache first, live fetch as
//! fallback) and diary create/read/update/delete.
//!
//! Creation runs in a serializable transaction so that two concurrent
//! creations for the same date cannot both commit against the same view of
//! the cache and diary. The loser gets `StoreError::SerializationConflict` and
//! is expected to retry. Updates, deletes and weather ingestion use the
//! store's default isolation.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, info_span, instrument, Span};

use crate::models::{DiaryEntry, WeatherRecord};
use crate::store::{settle, Isolation, Store, StoreError, StoreTx};
use crate::weather::{parse_weather, WeatherError, WeatherSource};

#[derive(Debug, Error)]
pub enum DiaryError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error("no diary entry for {0}")]
    NotFound(NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DiaryError {
    /// True when the operation lost a serialization race and may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DiaryError::Store(StoreError::SerializationConflict))
    }
}

pub struct DiaryService {
    store: Arc<dyn Store>,
    weather: Arc<dyn WeatherSource>,
    span: Span,
}

impl DiaryService {
    pub fn new(store: Arc<dyn Store>, weather: Arc<dyn WeatherSource>) -> Self {
        let span = info_span!("diary_service", backend = store.backend_name());
        Self {
            store,
            weather,
            span,
        }
    }

    /// Weather for `date`: the earliest cached record if any, otherwise a live
    /// fetch. A live result is returned without being cached.
    ///
    /// The cache read is settled before any fetch, so no pooled connection
    /// waits on the provider here. Creation cannot do the same and holds its
    /// transaction across the fetch.
    #[instrument(parent = &self.span, skip(self), err)]
    pub async fn resolve_weather(&self, date: NaiveDate) -> Result<WeatherRecord, DiaryError> {
        let mut tx = self.store.begin(Isolation::ReadCommitted).await?;
        let outcome = tx.find_weather_for_date(date).await.map_err(DiaryError::from);
        let cached = settle(tx, outcome).await?;
        self.first_or_fetch(cached, date).await
    }

    #[instrument(parent = &self.span, skip(self, text), err)]
    pub async fn create_diary(&self, date: NaiveDate, text: &str) -> Result<DiaryEntry, DiaryError> {
        let mut tx = self.store.begin(Isolation::Serializable).await?;
        let outcome = self.create_in(tx.as_mut(), date, text).await;
        let saved = settle(tx, outcome).await?;
        info!(id = ?saved.id, "Created diary entry for {date}");
        Ok(saved)
    }

    #[instrument(parent = &self.span, skip(self), err)]
    pub async fn read_diary(&self, date: NaiveDate) -> Result<Vec<DiaryEntry>, DiaryError> {
        let mut tx = self.store.begin(Isolation::ReadCommitted).await?;
        let outcome = tx.find_diaries_for_date(date).await.map_err(DiaryError::from);
        settle(tx, outcome).await
    }

    /// Entries dated within `[start, end]`. Ordering of the bounds is the
    /// caller's concern; reversed bounds yield nothing.
    #[instrument(parent = &self.span, skip(self), err)]
    pub async fn read_diaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, DiaryError> {
        let mut tx = self.store.begin(Isolation::ReadCommitted).await?;
        let outcome = tx
            .find_diaries_between(start, end)
            .await
            .map_err(DiaryError::from);
        settle(tx, outcome).await
    }

    /// Rewrites the text of the first entry for `date`. Other entries on the
    /// same date are left alone.
    #[instrument(parent = &self.span, skip(self, text), err)]
    pub async fn update_diary(&self, date: NaiveDate, text: &str) -> Result<DiaryEntry, DiaryError> {
        let mut tx = self.store.begin(Isolation::ReadCommitted).await?;
        let outcome = Self::update_in(tx.as_mut(), date, text).await;
        settle(tx, outcome).await
    }

    /// Removes every entry for `date` and returns how many there were.
    #[instrument(parent = &self.span, skip(self), err)]
    pub async fn delete_diary(&self, date: NaiveDate) -> Result<u64, DiaryError> {
        let mut tx = self.store.begin(Isolation::ReadCommitted).await?;
        let outcome = tx
            .delete_diaries_for_date(date)
            .await
            .map_err(DiaryError::from);
        let removed = settle(tx, outcome).await?;
        info!("Deleted {removed} diary entries for {date}");
        Ok(removed)
    }

    /// Fetches current weather, stamps it with `today`, and appends it to the
    /// cache. Never checks for an existing record, so repeated runs on one
    /// day leave duplicates.
    #[instrument(parent = &self.span, skip(self), err)]
    pub async fn ingest_weather(&self, today: NaiveDate) -> Result<WeatherRecord, DiaryError> {
        let record = self.fetch_live(today).await?;
        let mut tx = self.store.begin(Isolation::ReadCommitted).await?;
        let outcome = tx.append_weather(&record).await.map_err(DiaryError::from);
        settle(tx, outcome).await?;
        info!(condition = %record.weather.condition, "Cached weather for {today}");
        Ok(record)
    }

    async fn resolve_weather_in(
        &self,
        tx: &mut dyn StoreTx,
        date: NaiveDate,
    ) -> Result<WeatherRecord, DiaryError> {
        let cached = tx.find_weather_for_date(date).await?;
        self.first_or_fetch(cached, date).await
    }

    async fn first_or_fetch(
        &self,
        cached: Vec<WeatherRecord>,
        date: NaiveDate,
    ) -> Result<WeatherRecord, DiaryError> {
        match cached.into_iter().next() {
            Some(record) => {
                debug!("Using cached weather for {date}");
                Ok(record)
            }
            None => {
                info!("No cached weather for {date}, fetching live");
                self.fetch_live(today()).await
            }
        }
    }

    async fn create_in(
        &self,
        tx: &mut dyn StoreTx,
        date: NaiveDate,
        text: &str,
    ) -> Result<DiaryEntry, DiaryError> {
        let resolved = self.resolve_weather_in(tx, date).await?;
        // Reading the date's entries brings them under the serializable
        // predicate lock, so a concurrent creation for the same date conflicts.
        let existing = tx.find_diaries_for_date(date).await?;
        debug!("{} existing entries for {date}", existing.len());
        Ok(tx
            .save_diary(DiaryEntry::new(date, text, resolved.weather))
            .await?)
    }

    async fn update_in(
        tx: &mut dyn StoreTx,
        date: NaiveDate,
        text: &str,
    ) -> Result<DiaryEntry, DiaryError> {
        let entry = tx
            .find_first_diary_for_date(date)
            .await?
            .ok_or(DiaryError::NotFound(date))?;
        Ok(tx.save_diary(entry.with_text(text)).await?)
    }

    async fn fetch_live(&self, stamp: NaiveDate) -> Result<WeatherRecord, DiaryError> {
        let raw = self.weather.fetch_current().await?;
        Ok(parse_weather(&raw, stamp)?)
    }
}

/// Live conditions are "current", so they are dated with the local calendar day.
fn today() -> NaiveDate {
    Local::now().date_naive()
}
