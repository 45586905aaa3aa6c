//! Once-a-day weather ingestion.
//!
//! A single background task sleeps until the next local occurrence of the
//! configured time, caches the current weather for today, and goes back to
//! sleep. A failed run is logged and skipped; the next attempt is the next
//! day's scheduled run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::diary::service::{DiaryError, DiaryService};
use crate::models::WeatherRecord;

/// Fires once per day at a fixed local wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct DailyTimer {
    at: NaiveTime,
}

impl DailyTimer {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// The first firing strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            // `checked_add_days` only fails at the end of chrono's calendar.
            now.date()
                .checked_add_days(Days::new(1))
                .unwrap_or(now.date())
                .and_time(self.at)
        }
    }

    /// Sleeps until the next firing.
    pub async fn tick(&self) {
        let now = Local::now().naive_local();
        let next = self.next_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!("Next weather ingestion at {next} (in {}s)", wait.as_secs());
        tokio::time::sleep(wait).await;
    }
}

pub struct DailyIngestionJob {
    service: Arc<DiaryService>,
    timer: DailyTimer,
}

impl DailyIngestionJob {
    pub fn new(service: Arc<DiaryService>, at: NaiveTime) -> Self {
        Self {
            service,
            timer: DailyTimer::new(at),
        }
    }

    /// One ingestion attempt for the current local date.
    pub async fn run_once(&self) -> Result<WeatherRecord, DiaryError> {
        let today = Local::now().date_naive();
        self.service.ingest_weather(today).await
    }

    /// Runs forever on its own task. Abort the handle to stop it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.timer.tick().await;
                match self.run_once().await {
                    Ok(record) => info!(
                        "Daily weather ingestion stored {} for {}",
                        record.weather.condition, record.date
                    ),
                    Err(e) => error!("Daily weather ingestion failed: {e}"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Isolation, MemoryStore, Store};
    use crate::test_utils::FakeWeather;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn moment(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_time(at(h, m))
    }

    #[test]
    fn test_next_after_later_today() {
        let timer = DailyTimer::new(at(1, 0));
        assert_eq!(timer.next_after(moment(10, 0, 30)), moment(10, 1, 0));
    }

    #[test]
    fn test_next_after_rolls_to_tomorrow() {
        let timer = DailyTimer::new(at(1, 0));
        assert_eq!(timer.next_after(moment(10, 13, 0)), moment(11, 1, 0));
    }

    #[test]
    fn test_next_after_exact_time_is_tomorrow() {
        let timer = DailyTimer::new(at(1, 0));
        assert_eq!(timer.next_after(moment(10, 1, 0)), moment(11, 1, 0));
    }

    #[test]
    fn test_next_after_crosses_month_end() {
        let timer = DailyTimer::new(at(1, 0));
        let next = timer.next_after(moment(31, 23, 0));
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_time(at(1, 0))
        );
    }

    async fn cached_today(store: &MemoryStore) -> usize {
        let mut tx = store.begin(Isolation::ReadCommitted).await.unwrap();
        tx.find_weather_for_date(Local::now().date_naive())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_two_runs_same_day_leave_two_records() {
        let store = MemoryStore::new();
        let service = Arc::new(DiaryService::new(
            Arc::new(store.clone()),
            Arc::new(FakeWeather::sunny()),
        ));
        let job = DailyIngestionJob::new(service, at(1, 0));

        job.run_once().await.unwrap();
        job.run_once().await.unwrap();

        assert_eq!(cached_today(&store).await, 2);
    }

    #[tokio::test]
    async fn test_failed_run_appends_nothing() {
        let store = MemoryStore::new();
        let service = Arc::new(DiaryService::new(
            Arc::new(store.clone()),
            Arc::new(FakeWeather::garbled()),
        ));
        let job = DailyIngestionJob::new(service, at(1, 0));

        assert!(job.run_once().await.is_err());
        assert_eq!(cached_today(&store).await, 0);
    }
}
