//! Session State Machine
//!
//! Classifies an instant in the market's local zone into one of the five
//! trading sessions and computes the next transition. Pure logic: the caller
//! supplies the instant and a [`HolidaySchedule`] snapshot.
//!
//! # Session layout (US Eastern wall-clock, half-open intervals)
//!
//! ```text
//! Sun 20:00 ──► Mon 03:50   Overnight          (also Mon-Fri 00:00-03:50)
//! Mon-Fri 03:50 - 04:00     Closed (micro-gap)
//! Mon-Fri 04:00 - 09:30     PreMarket
//! Mon-Fri 09:30 - 16:00     RegularMarket
//! Mon-Fri 16:00 - 20:00     AfterMarket
//! everything else           Closed
//! ```
//!
//! Evaluation order matters: the weekend/holiday closure check runs first
//! (Sunday evening exempt), then the overnight check, because the overnight
//! session straddles midnight and the week boundary and would otherwise be
//! misclassified by the plain window table.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use super::calendar::{CalendarError, HolidaySchedule};

/// The market's home zone (US Eastern).
pub const MARKET_TZ: Tz = chrono_tz::America::New_York;

const fn wall_clock(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(t) => t,
        None => panic!("session boundary must be a valid wall-clock time"),
    }
}

/// Overnight session hands off to the pre-open gap.
const OVERNIGHT_HANDOFF: NaiveTime = wall_clock(3, 50);
/// Pre-market session opens.
const PRE_MARKET_OPEN: NaiveTime = wall_clock(4, 0);
/// Regular session opens.
const REGULAR_OPEN: NaiveTime = wall_clock(9, 30);
/// Regular session closes.
const REGULAR_CLOSE: NaiveTime = wall_clock(16, 0);
/// After-market session closes; the overnight window opens Sunday evenings.
const AFTER_MARKET_CLOSE: NaiveTime = wall_clock(20, 0);

/// The five mutually exclusive phases of the trading week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Extended overnight window, Sunday evening through weekday 03:50.
    Overnight,
    /// Pre-market session, 04:00-09:30.
    PreMarket,
    /// Regular trading hours, 09:30-16:00.
    RegularMarket,
    /// After-market session, 16:00-20:00.
    AfterMarket,
    /// No session: weekends, holidays, and the 03:50-04:00 micro-gap.
    Closed,
}

impl SessionState {
    /// Localized display label used on the API surface.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overnight => "Overnight",
            Self::PreMarket => "盘前",
            Self::RegularMarket => "盘中",
            Self::AfterMarket => "盘后",
            Self::Closed => "休市",
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The holiday calendar could not produce a next open day.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// A session boundary fell into a non-existent local time.
    #[error("wall-clock {time} does not exist on {date} in {zone}")]
    NonexistentLocalTime {
        /// Date of the boundary.
        date: NaiveDate,
        /// Wall-clock time of the boundary.
        time: NaiveTime,
        /// Zone the boundary was resolved in.
        zone: Tz,
    },

    /// Date arithmetic ran off the end of the supported calendar.
    #[error("calendar date arithmetic overflowed past {0}")]
    DateOutOfRange(NaiveDate),
}

/// Result of classifying an instant: where we are, what comes next, and
/// how many seconds away the transition is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    /// Session the market is in right now.
    pub current: SessionState,
    /// Session the market enters at the next transition.
    pub next: SessionState,
    /// Non-negative seconds until the next transition.
    pub seconds_to_next: f64,
}

impl SessionSnapshot {
    #[allow(clippy::cast_precision_loss)]
    fn until(
        current: SessionState,
        next: SessionState,
        now: &DateTime<Tz>,
        next_at: DateTime<Tz>,
    ) -> Self {
        let millis = next_at.signed_duration_since(*now).num_milliseconds();
        Self {
            current,
            next,
            seconds_to_next: (millis as f64 / 1000.0).max(0.0),
        }
    }
}

/// Clock producing the current instant in a fixed named zone.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    tz: Tz,
}

impl SessionClock {
    /// Create a clock pinned to `tz`.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// The current instant in this clock's zone.
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// The zone this clock reports in.
    #[must_use]
    pub const fn time_zone(&self) -> Tz {
        self.tz
    }
}

/// Classify `now` and compute the next transition.
///
/// # Errors
///
/// Returns [`SessionError::Calendar`] when the closed branch cannot find an
/// open day within the scan horizon, and [`SessionError::NonexistentLocalTime`]
/// if a boundary instant cannot be represented in the local zone.
pub fn compute_state(
    now: &DateTime<Tz>,
    schedule: &HolidaySchedule,
) -> Result<SessionSnapshot, SessionError> {
    let tz = now.timezone();
    let today = now.date_naive();
    let time = now.time();
    let weekday = today.weekday();

    // Weekend or full-day holiday: closed until the next open day's regular
    // open. Sunday evening is exempt: the overnight window opens at 20:00.
    let weekend = weekday == Weekday::Sat
        || (weekday == Weekday::Sun && time < AFTER_MARKET_CLOSE);
    if weekend || schedule.is_full_day_closure(today) {
        return closed_until_next_open(now, schedule, today);
    }

    // Overnight straddles midnight: Sunday evening and weekday early mornings.
    if (weekday == Weekday::Sun && time >= AFTER_MARKET_CLOSE) || time < OVERNIGHT_HANDOFF {
        let handoff_day = if time < OVERNIGHT_HANDOFF {
            today
        } else {
            today
                .succ_opt()
                .ok_or(SessionError::DateOutOfRange(today))?
        };
        let next_at = instant_at(tz, handoff_day, OVERNIGHT_HANDOFF)?;
        return Ok(SessionSnapshot::until(
            SessionState::Overnight,
            SessionState::PreMarket,
            now,
            next_at,
        ));
    }

    if time >= PRE_MARKET_OPEN && time < REGULAR_OPEN {
        let next_at = instant_at(tz, today, REGULAR_OPEN)?;
        Ok(SessionSnapshot::until(
            SessionState::PreMarket,
            SessionState::RegularMarket,
            now,
            next_at,
        ))
    } else if time >= REGULAR_OPEN && time < REGULAR_CLOSE {
        let next_at = instant_at(tz, today, REGULAR_CLOSE)?;
        Ok(SessionSnapshot::until(
            SessionState::RegularMarket,
            SessionState::AfterMarket,
            now,
            next_at,
        ))
    } else if time >= REGULAR_CLOSE && time < AFTER_MARKET_CLOSE {
        let next_at = instant_at(tz, today, AFTER_MARKET_CLOSE)?;
        Ok(SessionSnapshot::until(
            SessionState::AfterMarket,
            SessionState::Overnight,
            now,
            next_at,
        ))
    } else if time >= OVERNIGHT_HANDOFF && time < PRE_MARKET_OPEN {
        // Micro-gap between the overnight handoff and the pre-market open.
        let next_at = instant_at(tz, today, PRE_MARKET_OPEN)?;
        Ok(SessionSnapshot::until(
            SessionState::Closed,
            SessionState::PreMarket,
            now,
            next_at,
        ))
    } else {
        // Weekday evening from 20:00: closed until the next open day.
        closed_until_next_open(now, schedule, today)
    }
}

fn closed_until_next_open(
    now: &DateTime<Tz>,
    schedule: &HolidaySchedule,
    today: NaiveDate,
) -> Result<SessionSnapshot, SessionError> {
    let open_day = schedule.next_trading_day(today)?;
    let next_at = instant_at(now.timezone(), open_day, REGULAR_OPEN)?;
    Ok(SessionSnapshot::until(
        SessionState::Closed,
        SessionState::PreMarket,
        now,
        next_at,
    ))
}

fn instant_at(tz: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>, SessionError> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or(SessionError::NonexistentLocalTime {
            date,
            time,
            zone: tz,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::HolidayEvent;
    use test_case::test_case;

    // Week of 2025-06-02: Monday through Friday open, no holidays.
    fn eastern(day: u32, h: u32, m: u32, s: u32) -> DateTime<Tz> {
        MARKET_TZ.with_ymd_and_hms(2025, 6, day, h, m, s).unwrap()
    }

    fn closure(day: u32) -> HolidayEvent {
        HolidayEvent {
            event_name: "Test Holiday".to_string(),
            at_date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            trading_hour: String::new(),
        }
    }

    #[test_case(3, 49, 59 => SessionState::Overnight; "overnight last second")]
    #[test_case(3, 50, 0 => SessionState::Closed; "micro gap opens")]
    #[test_case(3, 59, 59 => SessionState::Closed; "micro gap last second")]
    #[test_case(4, 0, 0 => SessionState::PreMarket; "pre market opens")]
    #[test_case(9, 29, 59 => SessionState::PreMarket; "pre market last second")]
    #[test_case(9, 30, 0 => SessionState::RegularMarket; "regular opens")]
    #[test_case(15, 59, 59 => SessionState::RegularMarket; "regular last second")]
    #[test_case(16, 0, 0 => SessionState::AfterMarket; "after market opens")]
    #[test_case(19, 59, 59 => SessionState::AfterMarket; "after market last second")]
    #[test_case(20, 0, 0 => SessionState::Closed; "weekday evening closed")]
    fn monday_boundaries(h: u32, m: u32, s: u32) -> SessionState {
        let schedule = HolidaySchedule::default();
        let now = eastern(2, h, m, s);
        compute_state(&now, &schedule).unwrap().current
    }

    #[test]
    fn overnight_early_morning_hands_off_same_day() {
        let schedule = HolidaySchedule::default();
        // Monday 03:49 -> 03:50 the same morning.
        let snapshot = compute_state(&eastern(2, 3, 49, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Overnight);
        assert_eq!(snapshot.next, SessionState::PreMarket);
        assert!((snapshot.seconds_to_next - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overnight_sunday_evening_wraps_to_monday() {
        let schedule = HolidaySchedule::default();
        // Sunday 2025-06-08 21:00 -> Monday 03:50.
        let snapshot = compute_state(&eastern(8, 21, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Overnight);
        assert_eq!(snapshot.next, SessionState::PreMarket);
        let expected = f64::from(6 * 3600 + 50 * 60);
        assert!((snapshot.seconds_to_next - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn sunday_evening_boundary_is_exact() {
        let schedule = HolidaySchedule::default();
        let before = compute_state(&eastern(8, 19, 59, 59), &schedule).unwrap();
        assert_eq!(before.current, SessionState::Closed);

        let after = compute_state(&eastern(8, 20, 0, 0), &schedule).unwrap();
        assert_eq!(after.current, SessionState::Overnight);
    }

    #[test]
    fn micro_gap_counts_down_to_pre_market() {
        let schedule = HolidaySchedule::default();
        let snapshot = compute_state(&eastern(2, 3, 50, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Closed);
        assert_eq!(snapshot.next, SessionState::PreMarket);
        assert!((snapshot.seconds_to_next - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pre_market_counts_down_to_regular_open() {
        let schedule = HolidaySchedule::default();
        let snapshot = compute_state(&eastern(2, 9, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::PreMarket);
        assert_eq!(snapshot.next, SessionState::RegularMarket);
        assert!((snapshot.seconds_to_next - 1800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn after_market_transitions_to_overnight_label() {
        let schedule = HolidaySchedule::default();
        let snapshot = compute_state(&eastern(2, 19, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::AfterMarket);
        assert_eq!(snapshot.next, SessionState::Overnight);
        assert!((snapshot.seconds_to_next - 3600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weekday_evening_waits_for_next_regular_open() {
        let schedule = HolidaySchedule::default();
        // Monday 20:00 -> Tuesday 09:30, 13.5 hours away.
        let snapshot = compute_state(&eastern(2, 20, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Closed);
        assert_eq!(snapshot.next, SessionState::PreMarket);
        let expected = f64::from(13 * 3600 + 30 * 60);
        assert!((snapshot.seconds_to_next - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn saturday_closed_until_monday_open() {
        let schedule = HolidaySchedule::default();
        // Saturday 2025-06-07 10:00 -> Monday 09:30, skipping Sunday.
        let snapshot = compute_state(&eastern(7, 10, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Closed);
        assert_eq!(snapshot.next, SessionState::PreMarket);
        let expected = f64::from(47 * 3600 + 30 * 60);
        assert!((snapshot.seconds_to_next - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn holiday_today_overrides_weekday_windows() {
        // Monday 2025-06-02 is a full-day holiday.
        let schedule = HolidaySchedule::from_events([closure(2)]);
        let snapshot = compute_state(&eastern(2, 10, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Closed);
        assert_eq!(snapshot.next, SessionState::PreMarket);
        // Next open is Tuesday 09:30, 23.5 hours away.
        let expected = f64::from(23 * 3600 + 30 * 60);
        assert!((snapshot.seconds_to_next - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn weekend_scan_skips_monday_holiday() {
        // Monday 2025-06-09 closed: Saturday resolves to Tuesday 09:30.
        let schedule = HolidaySchedule::from_events([closure(9)]);
        let snapshot = compute_state(&eastern(7, 12, 0, 0), &schedule).unwrap();
        assert_eq!(snapshot.current, SessionState::Closed);
        let expected = f64::from(69 * 3600 + 30 * 60);
        assert!((snapshot.seconds_to_next - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_calendar_is_a_request_error() {
        let events = (1..=30).map(|offset| {
            let date = NaiveDate::from_ymd_opt(2025, 6, 7).unwrap() + chrono::Days::new(offset);
            HolidayEvent {
                event_name: "Closed".to_string(),
                at_date: date,
                trading_hour: String::new(),
            }
        });
        let schedule = HolidaySchedule::from_events(events);

        let err = compute_state(&eastern(7, 12, 0, 0), &schedule).unwrap_err();
        assert!(matches!(err, SessionError::Calendar(_)));
    }

    #[test]
    fn labels_are_localized() {
        assert_eq!(SessionState::Overnight.label(), "Overnight");
        assert_eq!(SessionState::PreMarket.label(), "盘前");
        assert_eq!(SessionState::RegularMarket.label(), "盘中");
        assert_eq!(SessionState::AfterMarket.label(), "盘后");
        assert_eq!(SessionState::Closed.label(), "休市");
    }

    #[test]
    fn session_clock_reports_in_its_zone() {
        let clock = SessionClock::new(MARKET_TZ);
        assert_eq!(clock.time_zone(), MARKET_TZ);
        let now = clock.now();
        assert_eq!(now.timezone(), MARKET_TZ);
    }
}
