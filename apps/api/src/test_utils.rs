//! Shared fixtures for unit tests: dates, weather values, provider payloads,
//! and a scripted `WeatherSource`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio::sync::Barrier;

use crate::models::{DiaryEntry, Weather, WeatherRecord};
use crate::store::{DiaryStore, Isolation, MemoryStore, Store, StoreError, StoreTx, WeatherCache};
use crate::weather::{WeatherError, WeatherSource};

/// A day in March 2024.
pub fn test_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub fn sample_weather(condition: &str) -> Weather {
    Weather {
        condition: condition.to_string(),
        icon: "01d".to_string(),
        temperature: 285.5,
    }
}

/// A minimal current-conditions body in the provider's shape.
pub fn sample_payload(condition: &str, icon: &str, temp: f64) -> String {
    json!({
        "weather": [{"id": 800, "main": condition, "description": "test", "icon": icon}],
        "main": {"temp": temp, "humidity": 50},
        "name": "Seoul"
    })
    .to_string()
}

/// Returns the same body on every call and counts calls. With a barrier,
/// each call waits at it before replying. With a gate, each call waits at it
/// twice: once on arrival and once more before replying, so a test can act
/// while the fetch is in flight.
pub struct FakeWeather {
    body: String,
    calls: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
    gate: Option<Arc<Barrier>>,
}

impl FakeWeather {
    pub fn returning(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            calls: AtomicUsize::new(0),
            barrier: None,
            gate: None,
        }
    }

    pub fn sunny() -> Self {
        Self::returning(sample_payload("Clear", "01d", 291.2))
    }

    /// A body that is not JSON at all.
    pub fn garbled() -> Self {
        Self::returning("failed to get response")
    }

    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn with_gate(mut self, gate: Arc<Barrier>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn fetch_current(&self) -> Result<String, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(gate) = &self.gate {
            gate.wait().await;
            gate.wait().await;
        }
        Ok(self.body.clone())
    }
}

/// A `MemoryStore` that counts transactions begun and not yet settled or dropped.
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    open: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_transactions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn begin(&self, isolation: Isolation) -> Result<Box<dyn StoreTx>, StoreError> {
        let inner = self.inner.begin(isolation).await?;
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountedTx {
            inner,
            _open: OpenGuard(Arc::clone(&self.open)),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct CountedTx {
    inner: Box<dyn StoreTx>,
    _open: OpenGuard,
}

#[async_trait]
impl WeatherCache for CountedTx {
    async fn find_weather_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<WeatherRecord>, StoreError> {
        self.inner.find_weather_for_date(date).await
    }

    async fn append_weather(&mut self, record: &WeatherRecord) -> Result<(), StoreError> {
        self.inner.append_weather(record).await
    }
}

#[async_trait]
impl DiaryStore for CountedTx {
    async fn save_diary(&mut self, entry: DiaryEntry) -> Result<DiaryEntry, StoreError> {
        self.inner.save_diary(entry).await
    }

    async fn find_diaries_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        self.inner.find_diaries_for_date(date).await
    }

    async fn find_diaries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, StoreError> {
        self.inner.find_diaries_between(start, end).await
    }

    async fn find_first_diary_for_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<DiaryEntry>, StoreError> {
        self.inner.find_first_diary_for_date(date).await
    }

    async fn delete_diaries_for_date(&mut self, date: NaiveDate) -> Result<u64, StoreError> {
        self.inner.delete_diaries_for_date(date).await
    }
}

#[async_trait]
impl StoreTx for CountedTx {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}
