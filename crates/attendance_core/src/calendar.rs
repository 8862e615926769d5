//! crates/attendance_core/src/calendar.rs
//!
//! The business calendar: one fixed UTC offset decides which calendar day an
//! instant belongs to, for attendance and for reports alike.

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, Offset, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Builds a calendar from an offset in minutes east of UTC.
    /// Returns `None` outside of +/- 24 hours.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The business day `now` falls on.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// An inclusive range of business days covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPeriod {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl MonthPeriod {
    /// The month containing `day`.
    pub fn containing(day: NaiveDate) -> Self {
        let first_day = day.with_day(1).unwrap_or(day);
        let last_day = first_day
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(first_day);
        Self {
            first_day,
            last_day,
        }
    }

    /// The calendar month before the one containing `day`.
    pub fn previous(day: NaiveDate) -> Self {
        let this_month = Self::containing(day);
        match this_month.first_day.pred_opt() {
            Some(last_of_previous) => Self::containing(last_of_previous),
            None => this_month,
        }
    }

    /// `YYYY-MM`, used in attachment names.
    pub fn key(&self) -> String {
        self.first_day.format("%Y-%m").to_string()
    }

    /// `June 2024`.
    pub fn label(&self) -> String {
        self.first_day.format("%B %Y").to_string()
    }
}
