use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// Failure to resolve a date-like input to a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("invalid date '{input}': expected YYYY-MM-DD or an ISO date-time")]
    Unparseable { input: String },

    #[error("month {year}-{month:02} is outside the supported calendar range")]
    MonthOutOfRange { year: i32, month: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayField {
    Start,
    End,
}

impl fmt::Display for HolidayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolidayField::Start => f.write_str("start"),
            HolidayField::End => f.write_str("end"),
        }
    }
}

/// Rejected holiday configuration. Raised while loading, never while querying.
#[derive(Debug, Error)]
pub enum HolidayError {
    #[error("invalid {field} date '{value}'")]
    InvalidDate {
        field: HolidayField,
        value: String,
        #[source]
        source: DateError,
    },

    #[error("start {start} is after end {end}")]
    ReversedRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid color '{color}': expected #rgb or #rrggbb")]
    InvalidColor { color: String },

    #[error("no display name given")]
    MissingName,

    #[error("holiday #{index} ({name})")]
    Entry {
        index: usize,
        name: String,
        #[source]
        source: Box<HolidayError>,
    },
}

impl HolidayError {
    /// Attaches the position and name of the offending configuration entry.
    pub fn at_entry(self, index: usize, name: impl Into<String>) -> HolidayError {
        HolidayError::Entry {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any `Entry` wrappers.
    pub fn root(&self) -> &HolidayError {
        match self {
            HolidayError::Entry { source, .. } => source.root(),
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LunarError {
    #[error("no lunar date for {date}: {reason}")]
    Unsupported { date: NaiveDate, reason: String },
}
