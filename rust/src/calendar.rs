//! Working-time calendar and the working-day axis used by the auto-scheduler.
//!
//! Durations and lags are counted in working days. The calendar answers which
//! dates are working days; [`WorkdayAxis`] maps signed working-day offsets
//! from a project anchor to dates and back.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_LOOKAHEAD_DAYS;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Errors raised while walking the calendar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Calendar exhausted: no working day found within the {horizon_days}-day horizon from {from}")]
    Exhausted { from: NaiveDate, horizon_days: u32 },
    #[error("Date arithmetic out of range near {from}")]
    DateOutOfRange { from: NaiveDate },
}

/// Working weekdays plus holiday exceptions for one project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingCalendar {
    pub working_weekdays: Vec<Weekday>,
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
    /// Horizon in calendar days: the longest scan for a working day and the
    /// furthest date from the axis origin. Set by the engine configuration,
    /// never read from the wire.
    #[serde(skip, default = "default_lookahead_days")]
    pub lookahead_days: u32,
}

fn default_lookahead_days() -> u32 {
    DEFAULT_LOOKAHEAD_DAYS
}

impl Default for WorkingCalendar {
    /// Monday to Friday, no holidays.
    fn default() -> Self {
        Self {
            working_weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            holidays: BTreeSet::new(),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }
}

impl WorkingCalendar {
    pub fn new(working_weekdays: Vec<Weekday>) -> Self {
        Self {
            working_weekdays,
            ..Self::default()
        }
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn with_lookahead_days(mut self, lookahead_days: u32) -> Self {
        self.lookahead_days = lookahead_days;
        self
    }

    #[inline]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_weekdays.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    fn exhausted(&self, from: NaiveDate) -> CalendarError {
        CalendarError::Exhausted {
            from,
            horizon_days: self.lookahead_days,
        }
    }

    /// First working day on or after `from`.
    pub fn next_working_day(&self, from: NaiveDate) -> Result<NaiveDate, CalendarError> {
        if self.working_weekdays.is_empty() {
            return Err(self.exhausted(from));
        }
        let mut candidate = from;
        for _ in 0..=self.lookahead_days {
            if self.is_working_day(candidate) {
                return Ok(candidate);
            }
            candidate = candidate
                .checked_add_days(Days::new(1))
                .ok_or(CalendarError::DateOutOfRange { from })?;
        }
        Err(self.exhausted(from))
    }

    /// Last working day on or before `from`.
    pub fn previous_working_day(&self, from: NaiveDate) -> Result<NaiveDate, CalendarError> {
        if self.working_weekdays.is_empty() {
            return Err(self.exhausted(from));
        }
        let mut candidate = from;
        for _ in 0..=self.lookahead_days {
            if self.is_working_day(candidate) {
                return Ok(candidate);
            }
            candidate = candidate
                .checked_sub_days(Days::new(1))
                .ok_or(CalendarError::DateOutOfRange { from })?;
        }
        Err(self.exhausted(from))
    }

    /// Move `n` working days away from the first working day on or after
    /// `date`. Negative `n` walks backwards.
    pub fn add_working_days(&self, date: NaiveDate, n: i64) -> Result<NaiveDate, CalendarError> {
        if n.unsigned_abs() > u64::from(self.lookahead_days) {
            return Err(self.exhausted(date));
        }
        let mut current = self.next_working_day(date)?;
        for _ in 0..n.unsigned_abs() {
            current = if n > 0 {
                let next = current
                    .checked_add_days(Days::new(1))
                    .ok_or(CalendarError::DateOutOfRange { from: current })?;
                self.next_working_day(next)?
            } else {
                let prev = current
                    .checked_sub_days(Days::new(1))
                    .ok_or(CalendarError::DateOutOfRange { from: current })?;
                self.previous_working_day(prev)?
            };
        }
        Ok(current)
    }

    /// Number of working days in `[start, end)`. Zero when `end <= start`.
    ///
    /// Counts whole weeks arithmetically, so the cost depends on the number
    /// of holidays in range, not on the length of the range.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end <= start {
            return 0;
        }
        let works = |day: &NaiveDate| self.working_weekdays.contains(&day.weekday());

        let full_weeks = (end - start).num_days() / 7;
        let per_week = WEEK
            .iter()
            .filter(|w| self.working_weekdays.contains(w))
            .count() as i64;
        // At most six leftover days after the whole weeks
        let leftover = start
            .checked_add_days(Days::new(full_weeks as u64 * 7))
            .map(|from| from.iter_days().take_while(|day| *day < end).filter(works).count() as i64)
            .unwrap_or(0);
        let holidays = self.holidays.range(start..end).filter(|h| works(*h)).count() as i64;

        full_weeks * per_week + leftover - holidays
    }
}

/// Bidirectional mapping between working-day offsets and dates.
///
/// Offset 0 is the first working day on or after the anchor. The table of
/// working days is extended lazily in both directions, so repeated lookups
/// are O(1) after the first walk.
#[derive(Debug, Clone)]
pub struct WorkdayAxis<'a> {
    calendar: &'a WorkingCalendar,
    /// `forward[i]` is the working day at offset `i`.
    forward: Vec<NaiveDate>,
    /// `backward[i]` is the working day at offset `-(i + 1)`.
    backward: Vec<NaiveDate>,
}

impl<'a> WorkdayAxis<'a> {
    pub fn new(calendar: &'a WorkingCalendar, anchor: NaiveDate) -> Result<Self, CalendarError> {
        let origin = calendar.next_working_day(anchor)?;
        Ok(Self {
            calendar,
            forward: vec![origin],
            backward: Vec::new(),
        })
    }

    /// The working day at offset 0.
    pub fn origin(&self) -> NaiveDate {
        self.forward[0]
    }

    fn exhausted(&self) -> CalendarError {
        CalendarError::Exhausted {
            from: self.origin(),
            horizon_days: self.calendar.lookahead_days,
        }
    }

    /// Reject dates more than `lookahead_days` calendar days from the origin.
    fn check_horizon(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        if (date - self.origin()).num_days().unsigned_abs() > u64::from(self.calendar.lookahead_days)
        {
            return Err(self.exhausted());
        }
        Ok(date)
    }

    /// Date of the working day at `offset`.
    pub fn date_at(&mut self, offset: i64) -> Result<NaiveDate, CalendarError> {
        // Each working day is at least one calendar day away
        if offset.unsigned_abs() > u64::from(self.calendar.lookahead_days) {
            return Err(self.exhausted());
        }
        if offset >= 0 {
            let idx = offset as usize;
            while self.forward.len() <= idx {
                let last = self.forward[self.forward.len() - 1];
                let next = last
                    .checked_add_days(Days::new(1))
                    .ok_or(CalendarError::DateOutOfRange { from: last })?;
                let day = self.calendar.next_working_day(next)?;
                self.forward.push(self.check_horizon(day)?);
            }
            Ok(self.forward[idx])
        } else {
            let idx = (-offset - 1) as usize;
            while self.backward.len() <= idx {
                let last = self.backward.last().copied().unwrap_or(self.forward[0]);
                let prev = last
                    .checked_sub_days(Days::new(1))
                    .ok_or(CalendarError::DateOutOfRange { from: last })?;
                let day = self.calendar.previous_working_day(prev)?;
                self.backward.push(self.check_horizon(day)?);
            }
            Ok(self.backward[idx])
        }
    }

    /// Exclusive end date for work finishing at `finish` with `duration` units.
    ///
    /// Zero-duration work ends where it starts; otherwise the end is the day
    /// after the last working day consumed.
    pub fn end_date(&mut self, finish: i64, duration: i64) -> Result<NaiveDate, CalendarError> {
        if duration == 0 {
            return self.date_at(finish);
        }
        let last_day = self.date_at(finish - 1)?;
        last_day
            .checked_add_days(Days::new(1))
            .ok_or(CalendarError::DateOutOfRange { from: last_day })
    }

    /// Offset at which work starting on `date` begins. Non-working dates map
    /// to the next working day.
    pub fn start_offset(&self, date: NaiveDate) -> Result<i64, CalendarError> {
        let origin = self.origin();
        self.check_horizon(date)?;
        Ok(if date >= origin {
            self.calendar.working_days_between(origin, date)
        } else {
            -self.calendar.working_days_between(date, origin)
        })
    }

    /// Exclusive finish offset for work whose last working day is `date`.
    /// Non-working dates map to the previous working day.
    pub fn finish_offset(&self, date: NaiveDate) -> Result<i64, CalendarError> {
        let offset = self.start_offset(date)?;
        Ok(if self.calendar.is_working_day(date) {
            offset + 1
        } else {
            offset
        })
    }
}
