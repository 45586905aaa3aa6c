use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{DiaryEntry, WeatherRecord};
use crate::store::{DiaryStore, Isolation, Store, StoreError, StoreTx, WeatherCache};

const DIARY_COLUMNS: &str = "id, date, text, weather, icon, temperature";

/// PostgreSQL-backed store. Tables are created by the embedded migrations.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self, isolation: Isolation) -> Result<Box<dyn StoreTx>, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Must be the first statement of the transaction.
        if isolation == Isolation::Serializable {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *tx)
                .await?;
        }
        Ok(Box::new(PgTransaction { tx }))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WeatherCache for PgTransaction {
    async fn find_weather_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<WeatherRecord>, StoreError> {
        Ok(sqlx::query_as::<_, WeatherRecord>(
            "SELECT date, weather, icon, temperature FROM date_weather WHERE date = $1 ORDER BY id ASC",
        )
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?)
    }

    async fn append_weather(&mut self, record: &WeatherRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO date_weather (date, weather, icon, temperature) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.date)
        .bind(&record.weather.condition)
        .bind(&record.weather.icon)
        .bind(record.weather.temperature)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DiaryStore for PgTransaction {
    async fn save_diary(&mut self, entry: DiaryEntry) -> Result<DiaryEntry, StoreError> {
        match entry.id {
            None => Ok(sqlx::query_as::<_, DiaryEntry>(&format!(
                r#"
                INSERT INTO diary (date, text, weather, icon, temperature)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {DIARY_COLUMNS}
                "#
            ))
            .bind(entry.date)
            .bind(&entry.text)
            .bind(&entry.weather.condition)
            .bind(&entry.weather.icon)
            .bind(entry.weather.temperature)
            .fetch_one(&mut *self.tx)
            .await?),
            // Date and weather are fixed at creation; only the text is rewritten.
            Some(id) => sqlx::query_as::<_, DiaryEntry>(&format!(
                "UPDATE diary SET text = $2, updated_at = now() WHERE id = $1 RETURNING {DIARY_COLUMNS}"
            ))
            .bind(id)
            .bind(&entry.text)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(StoreError::MissingRow(id)),
        }
    }

    async fn find_diaries_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        Ok(sqlx::query_as::<_, DiaryEntry>(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary WHERE date = $1 ORDER BY id ASC"
        ))
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?)
    }

    async fn find_diaries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        Ok(sqlx::query_as::<_, DiaryEntry>(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary WHERE date BETWEEN $1 AND $2 ORDER BY date ASC, id ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.tx)
        .await?)
    }

    async fn find_first_diary_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<DiaryEntry>, StoreError> {
        Ok(sqlx::query_as::<_, DiaryEntry>(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary WHERE date = $1 ORDER BY id ASC LIMIT 1"
        ))
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await?)
    }

    async fn delete_diaries_for_date(&mut self, date: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM diary WHERE date = $1")
            .bind(date)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StoreTx for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
