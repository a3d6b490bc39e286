use std::fmt;

use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone
};
use serde::Serialize;

use crate::error::DateError;

const ISO_DATE: &str = "%Y-%m-%d";
const ISO_DATE_TIME: &str =
  "%Y-%m-%dT%H:%M:%S%.f";

#[inline]
pub const fn is_leap(year: i32) -> bool {
  (year % 4 == 0 && year % 100 != 0)
    || year % 400 == 0
}

/// Number of days in `month` (1-based) of
/// `year`. Returns 0 for a month outside
/// 1..=12.
pub const fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  const NO_LEAP: [u32; 13] = [
    0, 31, 28, 31, 30, 31, 30, 31, 31,
    30, 31, 30, 31
  ];
  const LEAP: [u32; 13] = [
    0, 31, 29, 31, 30, 31, 30, 31, 31,
    30, 31, 30, 31
  ];

  if month == 0 || month > 12 {
    return 0;
  }
  if is_leap(year) {
    LEAP[month as usize]
  } else {
    NO_LEAP[month as usize]
  }
}

#[inline]
pub fn is_last_day_of_month(
  date: NaiveDate
) -> bool {
  date.day()
    == days_in_month(
      date.year(),
      date.month()
    )
}

fn last_instant_of_day() -> NaiveTime {
  // 23:59:59.999 always exists.
  NaiveTime::from_hms_milli_opt(
    23, 59, 59, 999
  )
  .unwrap_or(NaiveTime::MIN)
}

/// A calendar day pinned to its first
/// (00:00:00.000) or last (23:59:59.999)
/// instant. Only used for comparisons.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize
)]
pub struct NormalizedDate(NaiveDateTime);

impl NormalizedDate {
  #[must_use]
  pub fn start_of_day(
    date: NaiveDate
  ) -> Self {
    Self(date.and_time(NaiveTime::MIN))
  }

  #[must_use]
  pub fn end_of_day(
    date: NaiveDate
  ) -> Self {
    Self(
      date.and_time(last_instant_of_day())
    )
  }

  pub fn instant(&self) -> NaiveDateTime {
    self.0
  }

  pub fn date(&self) -> NaiveDate {
    self.0.date()
  }

  pub fn year(&self) -> i32 {
    self.0.year()
  }

  pub fn month(&self) -> u32 {
    self.0.month()
  }
}

impl fmt::Display for NormalizedDate {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.0.format("%Y-%m-%d %H:%M:%S%.3f")
    )
  }
}

/// Anything that names a calendar day.
pub trait DateLike {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError>;
}

impl DateLike for NaiveDate {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    Ok(*self)
  }
}

impl DateLike for NaiveDateTime {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    Ok(self.date())
  }
}

impl<Tz: TimeZone> DateLike for DateTime<Tz> {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    Ok(self.date_naive())
  }
}

impl DateLike for NormalizedDate {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    Ok(self.date())
  }
}

impl DateLike for str {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    parse_calendar_day(self)
  }
}

impl DateLike for String {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    parse_calendar_day(self)
  }
}

impl<T: DateLike + ?Sized> DateLike for &T {
  fn calendar_day(
    &self
  ) -> Result<NaiveDate, DateError> {
    (**self).calendar_day()
  }
}

/// Parses `YYYY-MM-DD`, a naive ISO
/// date-time, or an RFC 3339 timestamp
/// into the calendar day it names.
pub fn parse_calendar_day(
  input: &str
) -> Result<NaiveDate, DateError> {
  let token = input.trim();

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, ISO_DATE
    )
  {
    return Ok(date);
  }
  if let Ok(dt) =
    NaiveDateTime::parse_from_str(
      token,
      ISO_DATE_TIME
    )
  {
    return Ok(dt.date());
  }
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.date_naive());
  }

  Err(DateError::Unparseable {
    input: input.to_string()
  })
}

/// Pins `input` to the start (or, with
/// `end_of_day`, the end) of its calendar
/// day. Never touches the input.
pub fn normalize<D: DateLike + ?Sized>(
  input: &D,
  end_of_day: bool
) -> Result<NormalizedDate, DateError> {
  let day = input.calendar_day()?;
  Ok(if end_of_day {
    NormalizedDate::end_of_day(day)
  } else {
    NormalizedDate::start_of_day(day)
  })
}

/// Day 1 at 00:00:00.000 through the last
/// day at 23:59:59.999 of one month.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct MonthWindow {
  pub start: NormalizedDate,
  pub end:   NormalizedDate
}

impl MonthWindow {
  #[must_use]
  pub fn containing(
    date: NaiveDate
  ) -> Self {
    MonthCursor::from_date(date).window()
  }
}

/// The month currently on display. Owned
/// by whoever drives navigation and
/// passed by value into rendering.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash
)]
pub struct MonthCursor {
  first: NaiveDate,
  last:  NaiveDate
}

impl MonthCursor {
  pub fn new(
    year: i32,
    month: u32
  ) -> Result<Self, DateError> {
    let out_of_range = || {
      DateError::MonthOutOfRange {
        year,
        month
      }
    };
    let first =
      NaiveDate::from_ymd_opt(
        year, month, 1
      )
      .ok_or_else(out_of_range)?;
    let last = NaiveDate::from_ymd_opt(
      year,
      month,
      days_in_month(year, month)
    )
    .ok_or_else(out_of_range)?;
    Ok(Self { first, last })
  }

  #[must_use]
  pub fn from_date(
    date: NaiveDate
  ) -> Self {
    Self::new(date.year(), date.month())
      .unwrap_or(Self {
        first: date,
        last:  date
      })
  }

  pub fn year(&self) -> i32 {
    self.first.year()
  }

  pub fn month(&self) -> u32 {
    self.first.month()
  }

  pub fn first_day(&self) -> NaiveDate {
    self.first
  }

  pub fn last_day(&self) -> NaiveDate {
    self.last
  }

  pub fn day_count(&self) -> u32 {
    self.last.day()
  }

  #[must_use]
  pub fn window(&self) -> MonthWindow {
    MonthWindow {
      start: NormalizedDate::start_of_day(
        self.first
      ),
      end:   NormalizedDate::end_of_day(
        self.last
      )
    }
  }

  pub fn days(
    &self
  ) -> impl Iterator<Item = NaiveDate> + '_
  {
    self.first.iter_days().take(
      self.day_count() as usize
    )
  }

  /// Moves `months` forward (negative:
  /// backward), wrapping the year. Stays
  /// put at the edge of chrono's range.
  #[must_use]
  pub fn shift(
    &self,
    months: i32
  ) -> Self {
    let index = i64::from(self.year())
      * 12
      + i64::from(self.month() - 1)
      + i64::from(months);
    let year = index.div_euclid(12);
    let month =
      index.rem_euclid(12) as u32 + 1;

    i32::try_from(year)
      .ok()
      .and_then(|year| {
        Self::new(year, month).ok()
      })
      .unwrap_or(*self)
  }

  #[must_use]
  pub fn next(&self) -> Self {
    self.shift(1)
  }

  #[must_use]
  pub fn prev(&self) -> Self {
    self.shift(-1)
  }

  /// Offset of day 1 from the first
  /// column of a week starting on
  /// `week_start`.
  pub fn leading_blanks(
    &self,
    week_start: chrono::Weekday
  ) -> u32 {
    let day_idx = self
      .first
      .weekday()
      .num_days_from_monday();
    let start_idx =
      week_start.num_days_from_monday();
    (7 + day_idx - start_idx) % 7
  }
}

impl fmt::Display for MonthCursor {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-{:02}",
      self.year(),
      self.month()
    )
  }
}
