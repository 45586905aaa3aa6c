//! In-process store used when no database is configured, and by tests.
//!
//! Writes are buffered per transaction and applied at commit. Reads see the
//! latest committed tables overlaid with the transaction's own writes.
//! Updates and deletes name the rows they affect by id, so a commit applies
//! exactly what the statement saw; an update whose row was deleted by another
//! commit fails with `MissingRow`.
//!
//! Serializable transactions that wrote anything are validated at commit:
//! if another transaction committed a diary write to a date this one read or
//! wrote after it began, the commit fails with `SerializationConflict`.
//! Weather appends never take part in that check.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::models::{DiaryEntry, WeatherRecord};
use crate::store::{DiaryStore, Isolation, Store, StoreError, StoreTx, WeatherCache};

#[derive(Debug, Default)]
struct Tables {
    /// Insertion order.
    weather: Vec<WeatherRecord>,
    /// Ascending id.
    diaries: Vec<DiaryEntry>,
    last_diary_id: i64,
    commit_seq: u64,
    /// Commit sequence of the latest diary write touching each date.
    last_diary_write: HashMap<NaiveDate, u64>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self, isolation: Isolation) -> Result<Box<dyn StoreTx>, StoreError> {
        let snapshot = self.tables.lock().await.commit_seq;
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            isolation,
            snapshot,
            reads: Vec::new(),
            pending: Vec::new(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Clone)]
enum Write {
    AppendWeather(WeatherRecord),
    InsertDiary(DiaryEntry),
    UpdateDiary { id: i64, date: NaiveDate, text: String },
    DeleteDiaries { date: NaiveDate, ids: Vec<i64> },
}

impl Write {
    /// Date of the diary rows this write touches. `None` for weather.
    fn diary_date(&self) -> Option<NaiveDate> {
        match self {
            Write::AppendWeather(_) => None,
            Write::InsertDiary(entry) => Some(entry.date),
            Write::UpdateDiary { date, .. } | Write::DeleteDiaries { date, .. } => Some(*date),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ReadPredicate {
    Date(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl ReadPredicate {
    fn covers(&self, date: NaiveDate) -> bool {
        match *self {
            ReadPredicate::Date(d) => d == date,
            ReadPredicate::Range(start, end) => start <= date && date <= end,
        }
    }
}

pub struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    isolation: Isolation,
    snapshot: u64,
    /// Diary reads only.
    reads: Vec<ReadPredicate>,
    pending: Vec<Write>,
}

impl MemoryTransaction {
    async fn diary_view(&self) -> Vec<DiaryEntry> {
        let mut rows = self.tables.lock().await.diaries.clone();
        for write in &self.pending {
            // An own update of a row another commit deleted stays invisible.
            let _ = apply_diary_write(&mut rows, write);
        }
        rows
    }

    fn conflicts_with(&self, tables: &Tables) -> bool {
        tables.last_diary_write.iter().any(|(date, seq)| {
            *seq > self.snapshot
                && (self.reads.iter().any(|r| r.covers(*date))
                    || self.pending.iter().any(|w| w.diary_date() == Some(*date)))
        })
    }
}

fn apply_diary_write(rows: &mut Vec<DiaryEntry>, write: &Write) -> Result<(), StoreError> {
    match write {
        Write::InsertDiary(entry) => {
            rows.push(entry.clone());
            rows.sort_by_key(|row| row.id);
        }
        Write::UpdateDiary { id, text, .. } => {
            let row = rows
                .iter_mut()
                .find(|row| row.id == Some(*id))
                .ok_or(StoreError::MissingRow(*id))?;
            row.text = text.clone();
        }
        Write::DeleteDiaries { ids, .. } => {
            rows.retain(|row| row.id.map_or(true, |id| !ids.contains(&id)))
        }
        Write::AppendWeather(_) => {}
    }
    Ok(())
}

#[async_trait]
impl WeatherCache for MemoryTransaction {
    async fn find_weather_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<WeatherRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let committed = tables.weather.iter();
        let own = self.pending.iter().filter_map(|w| match w {
            Write::AppendWeather(record) => Some(record),
            _ => None,
        });
        Ok(committed
            .chain(own)
            .filter(|record| record.date == date)
            .cloned()
            .collect())
    }

    async fn append_weather(&mut self, record: &WeatherRecord) -> Result<(), StoreError> {
        self.pending.push(Write::AppendWeather(record.clone()));
        Ok(())
    }
}

#[async_trait]
impl DiaryStore for MemoryTransaction {
    async fn save_diary(&mut self, mut entry: DiaryEntry) -> Result<DiaryEntry, StoreError> {
        match entry.id {
            None => {
                // Ids behave like a sequence: consumed even if the transaction rolls back.
                let mut tables = self.tables.lock().await;
                tables.last_diary_id += 1;
                entry.id = Some(tables.last_diary_id);
                drop(tables);
                self.pending.push(Write::InsertDiary(entry.clone()));
            }
            Some(id) => {
                let existing = self
                    .diary_view()
                    .await
                    .into_iter()
                    .find(|row| row.id == Some(id))
                    .ok_or(StoreError::MissingRow(id))?;
                entry = existing.with_text(entry.text);
                self.pending.push(Write::UpdateDiary {
                    id,
                    date: entry.date,
                    text: entry.text.clone(),
                });
            }
        }
        Ok(entry)
    }

    async fn find_diaries_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        self.reads.push(ReadPredicate::Date(date));
        let mut rows = self.diary_view().await;
        rows.retain(|row| row.date == date);
        Ok(rows)
    }

    async fn find_diaries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        self.reads.push(ReadPredicate::Range(start, end));
        let mut rows = self.diary_view().await;
        rows.retain(|row| start <= row.date && row.date <= end);
        rows.sort_by_key(|row| (row.date, row.id));
        Ok(rows)
    }

    async fn find_first_diary_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<DiaryEntry>, StoreError> {
        Ok(self.find_diaries_for_date(date).await?.into_iter().next())
    }

    /// Deletes the rows visible now; rows committed by others afterwards survive.
    async fn delete_diaries_for_date(&mut self, date: NaiveDate) -> Result<u64, StoreError> {
        let ids: Vec<i64> = self
            .find_diaries_for_date(date)
            .await?
            .into_iter()
            .filter_map(|row| row.id)
            .collect();
        let removed = ids.len() as u64;
        self.pending.push(Write::DeleteDiaries { date, ids });
        Ok(removed)
    }
}

#[async_trait]
impl StoreTx for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.lock().await;
        if self.isolation == Isolation::Serializable && self.conflicts_with(&tables) {
            return Err(StoreError::SerializationConflict);
        }

        // All or nothing: build the new diary table before touching the shared one.
        let mut diaries = tables.diaries.clone();
        for write in &self.pending {
            apply_diary_write(&mut diaries, write)?;
        }

        tables.commit_seq += 1;
        let seq = tables.commit_seq;
        tables.diaries = diaries;
        for write in &self.pending {
            match write {
                Write::AppendWeather(record) => tables.weather.push(record.clone()),
                other => {
                    if let Some(date) = other.diary_date() {
                        tables.last_diary_write.insert(date, seq);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
