use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use std::collections::HashSet;

/// Trading-hours gate for the pipeline.
///
/// Open/close are wall-clock times at the exchange, expressed through the
/// configured UTC offset. Equity sessions close on weekends; round-the-clock
/// markets set `weekdays_only` to false.
#[derive(Debug, Clone)]
pub struct TradingSession {
    utc_offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
    weekdays_only: bool,
    holidays: HashSet<NaiveDate>,
}

impl TradingSession {
    pub fn new(
        utc_offset: FixedOffset,
        open: NaiveTime,
        close: NaiveTime,
        weekdays_only: bool,
        holidays: HashSet<NaiveDate>,
    ) -> Self {
        Self {
            utc_offset,
            open,
            close,
            weekdays_only,
            holidays,
        }
    }

    /// Whether the market is open at the given instant.
    ///
    /// The close bound is inclusive, matching the exchange convention that
    /// the final bar of the day closes exactly at the session close.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.utc_offset);

        if self.weekdays_only && local.weekday().num_days_from_monday() >= 5 {
            return false;
        }
        if self.holidays.contains(&local.date_naive()) {
            return false;
        }

        let t = local.time();
        // Compare at second precision; sub-second jitter must not flip the gate.
        let t = NaiveTime::from_hms_opt(t.hour(), t.minute(), t.second()).unwrap_or(t);
        self.open <= t && t <= self.close
    }

    pub fn is_open_now(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    /// Session length in minutes, used to derive periods-per-year.
    pub fn minutes_per_day(&self) -> u32 {
        (self.close - self.open).num_minutes().max(0) as u32
    }
}
