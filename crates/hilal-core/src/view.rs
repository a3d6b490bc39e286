//! Presentation-ready description of one month: everything a renderer needs,
//! computed fresh from the holiday list, a lunar calendar and the month being
//! shown.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::config::DisplaySettings;
use crate::date::MonthCursor;
use crate::holiday::{HolidayRecord, filter_visible, find_holiday};
use crate::locale::Lang;
use crate::lunar::{LunarCalendar, hijri_header, lunar_or_default};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolidayBadge {
    pub name: String,
    pub color: String,
}

impl HolidayBadge {
    fn from_record(record: &HolidayRecord, lang: Lang) -> Self {
        Self {
            name: record.display_name(lang).to_string(),
            color: record.color().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub hijri_day: u32,
    pub holiday: Option<HolidayBadge>,
    pub is_today: bool,
    /// Screen-reader style description, set for holidays and today.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub month: String,
    pub lang: Lang,
    pub gregorian_title: String,
    pub hijri_title: String,
    pub weekdays: Vec<String>,
    pub leading_blanks: u32,
    pub cells: Vec<DayCell>,
    pub legend: Vec<HolidayBadge>,
}

impl MonthView {
    /// Cells laid out in rows of seven, padded with `None` before day 1 and
    /// after the last day.
    pub fn weeks(&self) -> Vec<Vec<Option<&DayCell>>> {
        let mut slots: Vec<Option<&DayCell>> = Vec::new();
        slots.extend((0..self.leading_blanks).map(|_| None));
        slots.extend(self.cells.iter().map(Some));
        while slots.len() % 7 != 0 {
            slots.push(None);
        }
        slots.chunks(7).map(|row| row.to_vec()).collect()
    }
}

#[tracing::instrument(skip(holidays, lunar, settings), fields(month = %cursor))]
pub fn build_month_view<L: LunarCalendar + ?Sized>(
    cursor: MonthCursor,
    holidays: &[HolidayRecord],
    lunar: &L,
    settings: &DisplaySettings,
    today: NaiveDate,
) -> MonthView {
    let lang = settings.lang;

    let cells: Vec<DayCell> = cursor
        .days()
        .map(|date| {
            let holiday = find_holiday(date, holidays);
            let is_today = date == today;
            let day = date.day();
            let label = match holiday {
                Some(h) => Some(format!(
                    "{day} {}: {}",
                    lang.holiday_label(),
                    h.display_name(lang)
                )),
                None if is_today => Some(format!("{day} {}", lang.today_label())),
                None => None,
            };
            DayCell {
                date,
                day,
                hijri_day: lunar_or_default(lunar, date).day,
                holiday: holiday.map(|h| HolidayBadge::from_record(h, lang)),
                is_today,
                label,
            }
        })
        .collect();

    let legend: Vec<HolidayBadge> =
        filter_visible(holidays, cursor.first_day(), settings.visibility)
            .into_iter()
            .map(|h| HolidayBadge::from_record(h, lang))
            .collect();
    debug!(
        days = cells.len(),
        legend = legend.len(),
        "built month view"
    );

    MonthView {
        month: cursor.to_string(),
        lang,
        gregorian_title: format!(
            "{} {}",
            lang.gregorian_month_name(cursor.month()),
            cursor.year()
        ),
        hijri_title: hijri_header(lunar, cursor.first_day(), cursor.last_day(), lang),
        weekdays: lang
            .weekday_labels(settings.week_start)
            .into_iter()
            .map(str::to_string)
            .collect(),
        leading_blanks: cursor.leading_blanks(settings.week_start),
        cells,
        legend,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, Weekday};

    use super::*;
    use crate::config::Config;
    use crate::holiday::{HolidayRecord, VisibilityOptions};
    use crate::lunar::tests::TableCalendar;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn english() -> DisplaySettings {
        let mut cfg = Config::defaults();
        cfg.apply_overrides(vec![("lang".to_string(), "en".to_string())]);
        cfg.display_settings().expect("valid settings")
    }

    fn holiday(en: &str, start: NaiveDate, end: NaiveDate, color: &str) -> HolidayRecord {
        HolidayRecord::new(
            BTreeMap::from([("en".to_string(), en.to_string())]),
            start,
            end,
            color,
        )
        .expect("valid holiday")
    }

    fn february_calendar() -> TableCalendar {
        let mut calendar = TableCalendar::default();
        let mut hijri_day = 13;
        let mut hijri_month = 8;
        for date in MonthCursor::new(2026, 2).expect("month").days() {
            calendar = calendar.with(date, 1447, hijri_month, hijri_day);
            hijri_day += 1;
            if hijri_day > 29 {
                hijri_day = 1;
                hijri_month += 1;
            }
        }
        calendar
    }

    #[test]
    fn marks_holidays_and_today() {
        let holidays = vec![
            holiday("Founding Day", ymd(2026, 2, 21), ymd(2026, 2, 21), "#938953"),
            holiday("Kuwait National Day", ymd(2026, 2, 24), ymd(2026, 2, 24), "#006fc0"),
        ];
        let view = build_month_view(
            MonthCursor::new(2026, 2).expect("month"),
            &holidays,
            &february_calendar(),
            &english(),
            ymd(2026, 2, 10),
        );

        assert_eq!(view.month, "2026-02");
        assert_eq!(view.gregorian_title, "February 2026");
        assert_eq!(view.hijri_title, "Sha'ban / Ramadan 1447");
        assert_eq!(view.cells.len(), 28);
        assert_eq!(view.leading_blanks, 0);
        assert_eq!(view.weekdays[0], "SUN");

        let founding = &view.cells[20];
        assert_eq!(founding.day, 21);
        assert_eq!(
            founding.holiday,
            Some(HolidayBadge {
                name: "Founding Day".to_string(),
                color: "#938953".to_string(),
            })
        );
        assert_eq!(founding.label.as_deref(), Some("21 Holiday: Founding Day"));

        let today = &view.cells[9];
        assert!(today.is_today);
        assert_eq!(today.holiday, None);
        assert_eq!(today.label.as_deref(), Some("10 Today"));

        assert_eq!(view.cells[0].hijri_day, 13);
        assert_eq!(view.cells[0].label, None);

        let legend: Vec<_> = view.legend.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(legend, vec!["Founding Day", "Kuwait National Day"]);
    }

    #[test]
    fn holiday_wins_over_today() {
        let holidays = vec![holiday("Founding Day", ymd(2026, 2, 21), ymd(2026, 2, 21), "#938953")];
        let view = build_month_view(
            MonthCursor::new(2026, 2).expect("month"),
            &holidays,
            &february_calendar(),
            &english(),
            ymd(2026, 2, 21),
        );
        let cell = &view.cells[20];
        assert!(cell.is_today);
        assert!(cell.holiday.is_some());
        assert_eq!(cell.label.as_deref(), Some("21 Holiday: Founding Day"));
    }

    #[test]
    fn legend_respects_carry_over_setting() {
        let holidays = vec![holiday("January Break", ymd(2026, 1, 25), ymd(2026, 1, 31), "#cd9364")];
        let cursor = MonthCursor::new(2026, 2).expect("month");

        let mut settings = english();
        settings.visibility = VisibilityOptions {
            allow_carry_over: true,
        };
        let with_carry =
            build_month_view(cursor, &holidays, &february_calendar(), &settings, ymd(2026, 3, 1));
        assert_eq!(with_carry.legend.len(), 1);
        assert!(with_carry.cells.iter().all(|c| c.holiday.is_none()));

        settings.visibility = VisibilityOptions::default();
        let without =
            build_month_view(cursor, &holidays, &february_calendar(), &settings, ymd(2026, 3, 1));
        assert!(without.legend.is_empty());
    }

    #[test]
    fn failed_lunar_lookups_show_zero() {
        let view = build_month_view(
            MonthCursor::new(2026, 3).expect("month"),
            &[],
            &TableCalendar::default(),
            &english(),
            ymd(2026, 2, 1),
        );
        assert!(view.cells.iter().all(|c| c.hijri_day == 0));
        assert_eq!(view.hijri_title, "? 0");
    }

    #[test]
    fn weeks_pad_both_ends() {
        let mut settings = english();
        settings.week_start = Weekday::Mon;
        let view = build_month_view(
            MonthCursor::new(2026, 2).expect("month"),
            &[],
            &TableCalendar::default(),
            &settings,
            ymd(2026, 1, 1),
        );
        // Feb 1 2026 is a Sunday: six blanks with Monday first
        let weeks = view.weeks();
        assert_eq!(weeks.len(), 5);
        assert!(weeks[0][..6].iter().all(Option::is_none));
        assert_eq!(weeks[0][6].map(|c| c.day), Some(1));
        assert_eq!(weeks[4][5].map(|c| c.day), Some(28));
        assert!(weeks[4][6].is_none());
    }
}
