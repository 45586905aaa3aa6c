//! Persistence contracts for the weather cache and the diary.
//!
//! Every store operation runs inside a transaction obtained from [`Store::begin`].
//! [`settle`] is the scoped-transaction wrapper: it commits when the body
//! succeeded and rolls back when it failed. Dropping a transaction without
//! settling it also discards its writes.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::models::{DiaryEntry, WeatherRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// SQLSTATE raised by PostgreSQL when a serializable transaction loses a race.
const SERIALIZATION_FAILURE: &str = "40001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    #[default]
    ReadCommitted,
    Serializable,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction aborted by a concurrent write; retry the operation")]
    SerializationConflict,

    #[error("diary entry {0} no longer exists")]
    MissingRow(i64),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(SERIALIZATION_FAILURE) {
                return StoreError::SerializationConflict;
            }
        }
        StoreError::Database(err)
    }
}

/// Append-only cache of resolved weather, keyed by date.
#[async_trait]
pub trait WeatherCache: Send {
    /// All records for `date`, earliest inserted first.
    async fn find_weather_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<WeatherRecord>, StoreError>;

    /// Unconditional insert. Duplicates for a date are kept.
    async fn append_weather(&mut self, record: &WeatherRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DiaryStore: Send {
    /// Inserts when `entry.id` is `None`, otherwise rewrites the entry's text.
    /// Returns the stored entry with its identity set.
    async fn save_diary(&mut self, entry: DiaryEntry) -> Result<DiaryEntry, StoreError>;

    /// Entries for `date` in insertion order.
    async fn find_diaries_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError>;

    /// Entries with `start <= date <= end`, ordered by date then insertion.
    /// Empty when `start > end`.
    async fn find_diaries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError>;

    async fn find_first_diary_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<DiaryEntry>, StoreError>;

    /// Returns how many entries were removed.
    async fn delete_diaries_for_date(&mut self, date: NaiveDate) -> Result<u64, StoreError>;
}

/// An open transaction over both stores.
#[async_trait]
pub trait StoreTx: WeatherCache + DiaryStore {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self, isolation: Isolation) -> Result<Box<dyn StoreTx>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Commits `tx` if `outcome` is `Ok`, rolls it back otherwise.
///
/// A failed commit replaces the outcome. A failed rollback is logged and the
/// original error is returned.
pub async fn settle<T, E>(tx: Box<dyn StoreTx>, outcome: Result<T, E>) -> Result<T, E>
where
    E: From<StoreError>,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}
