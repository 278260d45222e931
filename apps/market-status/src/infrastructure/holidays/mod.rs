//! Holiday Calendar Service
//!
//! Owns the shared [`HolidaySchedule`] snapshot and refreshes it from the
//! external calendar source on a fixed schedule. The rebuild is atomic from
//! a reader's perspective: a new snapshot is constructed off to the side and
//! swapped in under the write lock, so readers observe either the old or the
//! new complete schedule, never a partial one.
//!
//! A failed refresh is logged and leaves the previous snapshot untouched;
//! stale holiday data is acceptable, and freshness is advisory only.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::domain::calendar::{HolidayEvent, HolidaySchedule};
use crate::infrastructure::finnhub::{FinnhubRestClient, RestError};

/// Shared, periodically refreshed holiday calendar.
#[derive(Debug, Default)]
pub struct HolidayCalendar {
    schedule: RwLock<Arc<HolidaySchedule>>,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
}

impl HolidayCalendar {
    /// Create a calendar with an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current schedule snapshot.
    ///
    /// Cheap to take: clones the `Arc`, not the schedule.
    #[must_use]
    pub fn snapshot(&self) -> Arc<HolidaySchedule> {
        Arc::clone(&self.schedule.read())
    }

    /// Instant of the last successful refresh, if any.
    #[must_use]
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed.read()
    }

    /// Atomically replace the schedule with one built from `events`.
    pub fn install(&self, events: Vec<HolidayEvent>) {
        let schedule = Arc::new(HolidaySchedule::from_events(events));
        *self.schedule.write() = schedule;
        *self.last_refreshed.write() = Some(Utc::now());
    }

    /// Fetch the holiday list and swap in a fresh schedule.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous schedule stays in place.
    pub async fn refresh(&self, rest: &FinnhubRestClient) -> Result<(), RestError> {
        let events = rest.market_holidays().await?;
        let count = events.len();
        self.install(events);
        tracing::info!(holidays = count, "Holiday calendar refreshed");
        Ok(())
    }
}

/// Run the periodic refresh loop until cancelled.
///
/// The first tick fires immediately, covering the refresh-at-startup
/// requirement; afterwards the loop wakes on the configured interval.
pub async fn run_refresh_task(
    calendar: Arc<HolidayCalendar>,
    rest: FinnhubRestClient,
    refresh_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Holiday refresh task cancelled");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = calendar.refresh(&rest).await {
                    tracing::warn!(error = %e, "Holiday refresh failed; keeping previous calendar");
                }
            }
        }
    }
}
