//! Timestamp utilities
//!
//! Summary tables are versioned by a leading date token in their name, either
//! `YYYYMMDD-HHhMMmSS` (written by this tool) or a bare `YYYYMMDD` (older
//! tables, hand-made exports).

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use std::cell::Cell;

/// chrono format of the full date token (`20230223-14h05m09`)
pub const DATE_TOKEN_FORMAT: &str = "%Y%m%d-%Hh%Mm%S";

const FULL_TOKEN_LEN: usize = 17;
const DATE_ONLY_LEN: usize = 8;

/// Render a timestamp as a table-name date token
pub fn format_date_token(at: NaiveDateTime) -> String {
    at.format(DATE_TOKEN_FORMAT).to_string()
}

/// Parse a table-name date token
///
/// Accepts exactly `YYYYMMDD-HHhMMmSS` or `YYYYMMDD` (midnight). Anything else,
/// including calendar-invalid dates such as `20230231`, yields `None`.
pub fn parse_date_token(token: &str) -> Option<NaiveDateTime> {
    if !token.is_ascii() {
        return None;
    }
    match token.len() {
        FULL_TOKEN_LEN => NaiveDateTime::parse_from_str(token, DATE_TOKEN_FORMAT).ok(),
        DATE_ONLY_LEN if token.bytes().all(|b| b.is_ascii_digit()) => {
            NaiveDate::parse_from_str(token, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

/// Source of "now" for stamping new tables
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in local time, second precision
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        // Tokens only carry seconds
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Deterministic clock advancing by a fixed step on every read
///
/// Two tables created in the same second would otherwise collide on name;
/// tests use this to produce distinct, ordered tokens.
#[derive(Debug)]
pub struct SteppingClock {
    next: Cell<NaiveDateTime>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: NaiveDateTime, step: Duration) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }

    /// Clock starting at the given token, advancing one minute per read
    pub fn starting_at(token: &str) -> Option<Self> {
        parse_date_token(token).map(|start| Self::new(start, Duration::minutes(1)))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let current = self.next.get();
        self.next.set(current + self.step);
        current
    }
}
