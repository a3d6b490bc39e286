use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ar,
    En,
}

const GREGORIAN_MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const GREGORIAN_MONTHS_AR: [&str; 12] = [
    "يناير",
    "فبراير",
    "مارس",
    "أبريل",
    "مايو",
    "يونيو",
    "يوليو",
    "أغسطس",
    "سبتمبر",
    "أكتوبر",
    "نوفمبر",
    "ديسمبر",
];

const HIJRI_MONTHS_EN: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabi' al-Awwal",
    "Rabi' al-Thani",
    "Jumada al-Awwal",
    "Jumada al-Thani",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

const HIJRI_MONTHS_AR: [&str; 12] = [
    "محرم",
    "صفر",
    "ربيع الأول",
    "ربيع الآخر",
    "جمادى الأولى",
    "جمادى الآخرة",
    "رجب",
    "شعبان",
    "رمضان",
    "شوال",
    "ذو القعدة",
    "ذو الحجة",
];

// Monday first, matching `Weekday::num_days_from_monday`.
const WEEKDAYS_EN: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];
const WEEKDAYS_AR: [&str; 7] = [
    "إثنين",
    "ثلاثاء",
    "أربعاء",
    "خميس",
    "جمعة",
    "سبت",
    "أحد",
];

const UNKNOWN_MONTH: &str = "?";

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Ar => "ar",
            Lang::En => "en",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Lang::Ar)
    }

    pub fn gregorian_month_name(&self, month: u32) -> &'static str {
        let table = match self {
            Lang::Ar => &GREGORIAN_MONTHS_AR,
            Lang::En => &GREGORIAN_MONTHS_EN,
        };
        month_entry(table, month)
    }

    pub fn hijri_month_name(&self, month: u32) -> &'static str {
        let table = match self {
            Lang::Ar => &HIJRI_MONTHS_AR,
            Lang::En => &HIJRI_MONTHS_EN,
        };
        month_entry(table, month)
    }

    pub fn weekday_name(&self, weekday: Weekday) -> &'static str {
        let table = match self {
            Lang::Ar => &WEEKDAYS_AR,
            Lang::En => &WEEKDAYS_EN,
        };
        table[weekday.num_days_from_monday() as usize]
    }

    /// Seven weekday labels in display order, starting at `week_start`.
    pub fn weekday_labels(&self, week_start: Weekday) -> Vec<&'static str> {
        let mut day = week_start;
        let mut labels = Vec::with_capacity(7);
        for _ in 0..7 {
            labels.push(self.weekday_name(day));
            day = day.succ();
        }
        labels
    }

    pub fn holiday_label(&self) -> &'static str {
        match self {
            Lang::Ar => "يوم عطلة",
            Lang::En => "Holiday",
        }
    }

    pub fn today_label(&self) -> &'static str {
        match self {
            Lang::Ar => "اليوم",
            Lang::En => "Today",
        }
    }
}

fn month_entry(table: &[&'static str; 12], month: u32) -> &'static str {
    match month {
        1..=12 => table[(month - 1) as usize],
        _ => UNKNOWN_MONTH,
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    /// Accepts bare codes and tagged locales such as `ar-SA` or `en_US`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "ar" => Ok(Lang::Ar),
            "en" => Ok(Lang::En),
            _ => Err(anyhow!("unsupported language: {s}")),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::Lang;

    #[test]
    fn parses_language_tags() {
        assert_eq!("ar".parse::<Lang>().expect("ar"), Lang::Ar);
        assert_eq!("AR-sa".parse::<Lang>().expect("ar-SA"), Lang::Ar);
        assert_eq!("en_US".parse::<Lang>().expect("en_US"), Lang::En);
        assert!("fr".parse::<Lang>().is_err());
        assert!("".parse::<Lang>().is_err());
    }

    #[test]
    fn month_names_are_one_based() {
        assert_eq!(Lang::En.gregorian_month_name(1), "January");
        assert_eq!(Lang::En.gregorian_month_name(12), "December");
        assert_eq!(Lang::En.hijri_month_name(9), "Ramadan");
        assert_eq!(Lang::Ar.hijri_month_name(9), "رمضان");
        assert_eq!(Lang::En.hijri_month_name(0), "?");
        assert_eq!(Lang::Ar.gregorian_month_name(13), "?");
    }

    #[test]
    fn weekday_labels_follow_week_start() {
        let sunday_first = Lang::En.weekday_labels(Weekday::Sun);
        assert_eq!(
            sunday_first,
            vec!["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"]
        );
        assert_eq!(Lang::En.weekday_labels(Weekday::Mon)[0], "MON");
        assert_eq!(Lang::Ar.weekday_labels(Weekday::Sat)[0], "سبت");
    }
}
