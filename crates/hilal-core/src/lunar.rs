use chrono::{Datelike, NaiveDate};
use hijri_date::HijriDate;
use serde::Serialize;
use tracing::warn;

use crate::error::LunarError;
use crate::locale::Lang;

/// Numeric Hijri date. `month` is 1-based; all-zero marks a failed
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LunarDate {
    pub year: u32,
    pub month: u32,
    pub day: u32,
}

impl LunarDate {
    pub fn is_known(&self) -> bool {
        self.month != 0
    }
}

/// Source of solar-to-lunar conversions. Implementations are trusted: the
/// returned fields are used as-is.
pub trait LunarCalendar {
    fn to_lunar(&self, date: NaiveDate) -> Result<LunarDate, LunarError>;

    fn month_name(&self, date: NaiveDate, lang: Lang) -> Result<String, LunarError> {
        let lunar = self.to_lunar(date)?;
        Ok(lang.hijri_month_name(lunar.month).to_string())
    }
}

/// Umm al-Qura tables via the `hijri_date` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct UmmAlQura;

impl LunarCalendar for UmmAlQura {
    fn to_lunar(&self, date: NaiveDate) -> Result<LunarDate, LunarError> {
        let unsupported = |reason: String| LunarError::Unsupported { date, reason };

        let year = usize::try_from(date.year())
            .map_err(|_| unsupported("year precedes the supported range".to_string()))?;
        let hd = HijriDate::from_gr(year, date.month() as usize, date.day() as usize)
            .map_err(|e| unsupported(format!("{e}")))?;

        let field = |value: usize| {
            u32::try_from(value).map_err(|_| unsupported(format!("field out of range: {value}")))
        };
        Ok(LunarDate {
            year: field(hd.year())?,
            month: field(hd.month())?,
            day: field(hd.day())?,
        })
    }
}

/// Converts `date`, substituting zeros when the calendar cannot answer so a
/// display never fails on a bad conversion.
pub fn lunar_or_default<L: LunarCalendar + ?Sized>(calendar: &L, date: NaiveDate) -> LunarDate {
    match calendar.to_lunar(date) {
        Ok(lunar) => lunar,
        Err(err) => {
            warn!(%date, error = %err, "lunar conversion failed; using fallback");
            LunarDate::default()
        }
    }
}

/// Hijri header for a Gregorian month: one month name when the Gregorian
/// month sits inside a single Hijri month, `start / end` otherwise. The year
/// is taken from the first day.
pub fn hijri_header<L: LunarCalendar + ?Sized>(
    calendar: &L,
    first_day: NaiveDate,
    last_day: NaiveDate,
    lang: Lang,
) -> String {
    let first = lunar_or_default(calendar, first_day);
    let last = lunar_or_default(calendar, last_day);
    let start_name = lang.hijri_month_name(first.month);
    let end_name = lang.hijri_month_name(last.month);

    if start_name == end_name {
        format!("{start_name} {}", first.year)
    } else {
        format!("{start_name} / {end_name} {}", first.year)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;

    /// Fixed answers for deterministic tests; dates not in the table fail.
    #[derive(Default)]
    pub(crate) struct TableCalendar {
        pub(crate) entries: BTreeMap<NaiveDate, LunarDate>,
    }

    impl TableCalendar {
        pub(crate) fn with(mut self, date: NaiveDate, year: u32, month: u32, day: u32) -> Self {
            self.entries.insert(date, LunarDate { year, month, day });
            self
        }
    }

    impl LunarCalendar for TableCalendar {
        fn to_lunar(&self, date: NaiveDate) -> Result<LunarDate, LunarError> {
            self.entries.get(&date).copied().ok_or(LunarError::Unsupported {
                date,
                reason: "not in table".to_string(),
            })
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn umm_al_qura_places_mid_march_2024_in_ramadan_1445() {
        let lunar = UmmAlQura.to_lunar(ymd(2024, 3, 20)).expect("supported date");
        assert_eq!(lunar.year, 1445);
        assert_eq!(lunar.month, 9);
        assert!((1..=30).contains(&lunar.day));
        assert_eq!(
            UmmAlQura.month_name(ymd(2024, 3, 20), Lang::En).expect("name"),
            "Ramadan"
        );
    }

    #[test]
    fn failed_conversion_falls_back_to_zero() {
        let calendar = TableCalendar::default();
        let lunar = lunar_or_default(&calendar, ymd(2026, 2, 1));
        assert_eq!(lunar, LunarDate::default());
        assert!(!lunar.is_known());
    }

    #[test]
    fn header_joins_two_hijri_months() {
        let calendar = TableCalendar::default()
            .with(ymd(2026, 2, 1), 1447, 8, 13)
            .with(ymd(2026, 2, 28), 1447, 9, 11);
        assert_eq!(
            hijri_header(&calendar, ymd(2026, 2, 1), ymd(2026, 2, 28), Lang::En),
            "Sha'ban / Ramadan 1447"
        );
    }

    #[test]
    fn header_uses_single_name_within_one_month() {
        let calendar = TableCalendar::default()
            .with(ymd(2026, 2, 1), 1447, 9, 1)
            .with(ymd(2026, 2, 28), 1447, 9, 28);
        assert_eq!(
            hijri_header(&calendar, ymd(2026, 2, 1), ymd(2026, 2, 28), Lang::Ar),
            "رمضان 1447"
        );
    }
}
