use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::color::parse_hex_color;
use crate::date::{MonthWindow, NormalizedDate, parse_calendar_day};
use crate::error::{HolidayError, HolidayField};
use crate::locale::Lang;
use crate::range::{is_carry_over, overlaps};

const BUILTIN_HOLIDAYS: &str = include_str!("../data/holidays.toml");
const FALLBACK_LANG: &str = "en";

/// A configured holiday: an inclusive run of calendar days with a color and
/// per-language names. Validated on construction, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolidayRecord {
    names: BTreeMap<String, String>,
    start: NaiveDate,
    end: NaiveDate,
    color: String,
}

/// A holiday entry as written in a holiday file, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHoliday {
    #[serde(default)]
    pub name: BTreeMap<String, String>,
    pub start: String,
    pub end: String,
    pub color: String,
}

#[derive(Debug, Deserialize)]
struct HolidayFile {
    #[serde(default)]
    holiday: Vec<RawHoliday>,
}

impl HolidayRecord {
    pub fn new(
        names: BTreeMap<String, String>,
        start: NaiveDate,
        end: NaiveDate,
        color: impl Into<String>,
    ) -> Result<Self, HolidayError> {
        let color = color.into();
        if names.values().all(|n| n.trim().is_empty()) {
            return Err(HolidayError::MissingName);
        }
        if start > end {
            return Err(HolidayError::ReversedRange { start, end });
        }
        if parse_hex_color(&color).is_none() {
            return Err(HolidayError::InvalidColor { color });
        }
        Ok(Self {
            names,
            start,
            end,
            color,
        })
    }

    pub fn from_raw(raw: &RawHoliday) -> Result<Self, HolidayError> {
        let parse = |field: HolidayField, value: &str| {
            parse_calendar_day(value).map_err(|source| HolidayError::InvalidDate {
                field,
                value: value.to_string(),
                source,
            })
        };
        let start = parse(HolidayField::Start, &raw.start)?;
        let end = parse(HolidayField::End, &raw.end)?;
        Self::new(raw.name.clone(), start, end, raw.color.clone())
    }

    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Name in `lang`, else English, else whichever name comes first.
    pub fn display_name(&self, lang: Lang) -> &str {
        pick_name(&self.names, lang.code()).unwrap_or_default()
    }

    pub fn normalized_start(&self) -> NormalizedDate {
        NormalizedDate::start_of_day(self.start)
    }

    pub fn normalized_end(&self) -> NormalizedDate {
        NormalizedDate::end_of_day(self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let target = NormalizedDate::start_of_day(date);
        target >= self.normalized_start() && target <= self.normalized_end()
    }
}

fn pick_name<'a>(names: &'a BTreeMap<String, String>, code: &str) -> Option<&'a str> {
    names
        .get(code)
        .or_else(|| names.get(FALLBACK_LANG))
        .or_else(|| names.values().next())
        .map(String::as_str)
}

/// Validates raw entries in order, failing on the first bad one.
pub fn validate_holidays(raw: &[RawHoliday]) -> Result<Vec<HolidayRecord>, HolidayError> {
    raw.iter()
        .enumerate()
        .map(|(index, entry)| {
            HolidayRecord::from_raw(entry).map_err(|err| {
                let name = pick_name(&entry.name, FALLBACK_LANG).unwrap_or("unnamed");
                err.at_entry(index, name)
            })
        })
        .collect()
}

#[tracing::instrument(skip(text))]
pub fn parse_holidays(text: &str, source: &str) -> anyhow::Result<Vec<HolidayRecord>> {
    let file: HolidayFile =
        toml::from_str(text).with_context(|| format!("failed to parse holiday list {source}"))?;
    let holidays = validate_holidays(&file.holiday)
        .with_context(|| format!("invalid holiday list {source}"))?;
    debug!(count = holidays.len(), "parsed holiday list");
    Ok(holidays)
}

#[tracing::instrument]
pub fn load_holiday_file(path: &Path) -> anyhow::Result<Vec<HolidayRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let holidays = parse_holidays(&text, &path.display().to_string())?;
    info!(file = %path.display(), count = holidays.len(), "loaded holidays");
    Ok(holidays)
}

/// The list compiled into the binary, used when no holiday file is set.
pub fn default_holidays() -> anyhow::Result<Vec<HolidayRecord>> {
    parse_holidays(BUILTIN_HOLIDAYS, "<built-in>")
}

/// First holiday, in list order, whose days include `date`.
///
/// Overlapping holidays are resolved by position: put the entry that should
/// win earlier in the list.
pub fn find_holiday(date: NaiveDate, holidays: &[HolidayRecord]) -> Option<&HolidayRecord> {
    holidays.iter().find(|h| h.contains(date))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityOptions {
    /// Also show holidays that ended on the last day of the previous month.
    pub allow_carry_over: bool,
}

pub fn is_visible_in_month(
    holiday: &HolidayRecord,
    reference: NaiveDate,
    options: VisibilityOptions,
) -> bool {
    let window = MonthWindow::containing(reference);
    let start = holiday.normalized_start();
    let end = holiday.normalized_end();

    let overlapping = overlaps(start, end, window.start, window.end);
    if options.allow_carry_over {
        overlapping || is_carry_over(end, window.start)
    } else {
        overlapping
    }
}

/// Holidays to list for the month containing `reference`, in input order.
pub fn filter_visible<'a>(
    holidays: &'a [HolidayRecord],
    reference: NaiveDate,
    options: VisibilityOptions,
) -> Vec<&'a HolidayRecord> {
    holidays
        .iter()
        .filter(|h| is_visible_in_month(h, reference, options))
        .collect()
}
