//! Holiday Schedule
//!
//! An immutable snapshot of the US market holiday calendar: one entry per
//! calendar date, keyed by date. A date with an empty `trading_hour` is a
//! full-day closure; a non-empty value describes a shortened session and is
//! carried through without further parsing.
//!
//! Absence of a date means "not a known holiday". A stale snapshot is still
//! authoritative for reads; freshness is tracked by the owning service.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Upper bound on the forward scan for the next open trading day.
///
/// The US calendar never has more than a handful of consecutive closed days;
/// the cap guards against a degenerate schedule marking everything closed.
pub const SCAN_HORIZON_DAYS: u32 = 30;

/// Calendar errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// The forward scan found no open trading day within the horizon.
    #[error("no open trading day within {horizon_days} days after {from}")]
    NoOpenDayWithinHorizon {
        /// Date the scan started from (exclusive).
        from: NaiveDate,
        /// Number of days scanned.
        horizon_days: u32,
    },
}

/// A single market holiday as published by the calendar source.
///
/// # Wire Format (JSON)
/// ```json
/// {"eventName": "Christmas Day", "atDate": "2025-12-25", "tradingHour": ""}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEvent {
    /// Human-readable holiday name.
    #[serde(rename = "eventName", default)]
    pub event_name: String,

    /// Calendar date in the market's local zone.
    #[serde(rename = "atDate")]
    pub at_date: NaiveDate,

    /// Trading hours for a shortened session; empty means closed all day.
    #[serde(rename = "tradingHour", default)]
    pub trading_hour: String,
}

impl HolidayEvent {
    /// Check whether this event closes the market for the whole day.
    #[must_use]
    pub fn is_full_day_closure(&self) -> bool {
        self.trading_hour.trim().is_empty()
    }
}

/// Immutable holiday schedule snapshot, keyed by date.
///
/// Built in one shot from a fetched holiday list and swapped in atomically
/// by the owning service; readers only ever see a complete schedule.
#[derive(Debug, Clone, Default)]
pub struct HolidaySchedule {
    events: BTreeMap<NaiveDate, HolidayEvent>,
}

impl HolidaySchedule {
    /// Build a schedule from a list of holiday events.
    ///
    /// Later entries for the same date replace earlier ones, matching the
    /// source's one-entry-per-date contract.
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = HolidayEvent>) -> Self {
        Self {
            events: events.into_iter().map(|e| (e.at_date, e)).collect(),
        }
    }

    /// Look up the holiday event for a date, if any.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&HolidayEvent> {
        self.events.get(&date)
    }

    /// True iff `date` has a holiday entry with no trading hours at all.
    #[must_use]
    pub fn is_full_day_closure(&self, date: NaiveDate) -> bool {
        self.events
            .get(&date)
            .is_some_and(HolidayEvent::is_full_day_closure)
    }

    /// Find the first open trading day strictly after `from`.
    ///
    /// Skips Saturdays, Sundays, and full-day closures. The scan is capped
    /// at [`SCAN_HORIZON_DAYS`] days.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::NoOpenDayWithinHorizon`] if every day in the
    /// horizon is closed.
    pub fn next_trading_day(&self, from: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let exhausted = CalendarError::NoOpenDayWithinHorizon {
            from,
            horizon_days: SCAN_HORIZON_DAYS,
        };

        let mut day = from;
        for _ in 0..SCAN_HORIZON_DAYS {
            day = day.succ_opt().ok_or_else(|| exhausted.clone())?;
            let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
            if !weekend && !self.is_full_day_closure(day) {
                return Ok(day);
            }
        }

        Err(exhausted)
    }

    /// The earliest holiday on or after `today`, if any.
    #[must_use]
    pub fn upcoming_holiday(&self, today: NaiveDate) -> Option<&HolidayEvent> {
        self.events.range(today..).next().map(|(_, event)| event)
    }

    /// Number of known holiday entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True iff the schedule has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
