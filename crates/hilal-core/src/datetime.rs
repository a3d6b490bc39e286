use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use tracing::{
  debug,
  warn
};

use crate::date::{
  MonthCursor,
  parse_calendar_day
};

const TIMEZONE_ENV_VAR: &str =
  "HILAL_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "HILAL_TIME_CONFIG";
const TIMEZONE_CONFIG_FILE: &str =
  "hilal-time.toml";
const DEFAULT_TIMEZONE: Tz =
  chrono_tz::Asia::Riyadh;

#[derive(Debug, Deserialize)]
struct TimezoneFile {
  timezone: String
}

/// Zone that decides which calendar day
/// "today" is: `HILAL_TIMEZONE`, then the
/// timezone file, then Riyadh.
pub fn project_timezone() -> &'static Tz
{
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  PROJECT_TZ.get_or_init(|| {
    let tz = std::env::var(
      TIMEZONE_ENV_VAR
    )
    .ok()
    .and_then(|raw| {
      timezone_named(
        &raw,
        TIMEZONE_ENV_VAR
      )
    })
    .or_else(timezone_from_file)
    .unwrap_or(DEFAULT_TIMEZONE);
    debug!(timezone = %tz, "resolved project timezone");
    tz
  })
}

/// The calendar day `now` falls on in the
/// project timezone.
#[must_use]
pub fn today(
  now: DateTime<Utc>
) -> NaiveDate {
  now
    .with_timezone(project_timezone())
    .date_naive()
}

fn timezone_from_file() -> Option<Tz> {
  let path = match std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    | Ok(raw) if !raw.trim().is_empty() => {
      PathBuf::from(raw.trim())
    }
    | _ => PathBuf::from(
      TIMEZONE_CONFIG_FILE
    )
  };

  let raw = fs::read_to_string(&path)
    .map_err(|err| {
      debug!(file = %path.display(), error = %err, "no timezone file");
    })
    .ok()?;

  match toml::from_str::<TimezoneFile>(
    &raw
  ) {
    | Ok(file) => timezone_named(
      &file.timezone,
      &path.display().to_string()
    ),
    | Err(err) => {
      warn!(file = %path.display(), error = %err, "ignoring malformed timezone file");
      None
    }
  }
}

fn timezone_named(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let name = raw.trim();
  name
    .parse::<Tz>()
    .map_err(|err| {
      warn!(source, timezone = name, error = %err, "ignoring unknown timezone");
    })
    .ok()
}

/// Resolves a user-typed date expression
/// to a calendar day, relative to `now`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let local_today = today(now);

  match lower.as_str() {
    | "now" | "today" => {
      return Ok(local_today);
    }
    | "tomorrow" => {
      return local_today
        .succ_opt()
        .ok_or_else(|| {
          anyhow!(
            "no day after {local_today}"
          )
        });
    }
    | "yesterday" => {
      return local_today
        .pred_opt()
        .ok_or_else(|| {
          anyhow!(
            "no day before {local_today}"
          )
        });
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    return NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    });
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      local_today,
      target_weekday
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    return NaiveDate::from_ymd_opt(
      local_today.year(),
      target_month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month value: \
         {target_month}"
      )
    });
  }

  if let Some(first) =
    parse_year_month(token)
  {
    return first;
  }

  if let Some(shifted) =
    parse_relative(token, local_today)?
  {
    return Ok(shifted);
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(today(
      DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)
    ));
  }

  if let Ok(date) =
    parse_calendar_day(token)
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     4-digit year, YYYY-MM, weekday \
     names (e.g. monday), month names \
     (e.g. march), +Nd/+Nw/+Nm, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS, \
     RFC3339, YYYYMMDDTHHMMSSZ"
  })
}

/// Like [`parse_date_expr`] but names a
/// month. A bare `+N`/`-N` moves that many
/// months from the current one.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_month_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<MonthCursor> {
  let token = input.trim();
  let step_re =
    Regex::new(r"^(?P<step>[+-]\d+)$")
      .map_err(|e| {
        anyhow!(
          "internal regex compile \
           failure: {e}"
        )
      })?;

  if let Some(caps) =
    step_re.captures(token)
  {
    let step: i32 = caps
      .name("step")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing month step")
      })?
      .parse()
      .context("invalid month step")?;
    return Ok(
      MonthCursor::from_date(today(
        now
      ))
      .shift(step)
    );
  }

  let date = parse_date_expr(token, now)?;
  Ok(MonthCursor::from_date(date))
}

fn parse_year_month(
  token: &str
) -> Option<anyhow::Result<NaiveDate>> {
  let ym_re = Regex::new(
    r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
  )
  .ok()?;
  let caps = ym_re.captures(token)?;
  let year = caps
    .name("year")?
    .as_str()
    .parse::<i32>()
    .ok()?;
  let month = caps
    .name("month")?
    .as_str()
    .parse::<u32>()
    .ok()?;

  Some(
    MonthCursor::new(year, month)
      .map(|cursor| cursor.first_day())
      .map_err(anyhow::Error::from)
  )
}

fn parse_relative(
  token: &str,
  from: NaiveDate
) -> anyhow::Result<Option<NaiveDate>> {
  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  let Some(caps) = rel_re.captures(token)
  else {
    return Ok(None);
  };

  let backwards = caps
    .name("sign")
    .map(|m| m.as_str() == "-")
    .ok_or_else(|| {
      anyhow!("missing relative sign")
    })?;
  let num: u32 = caps
    .name("num")
    .map(|m| m.as_str())
    .ok_or_else(|| {
      anyhow!("missing relative amount")
    })?
    .parse()
    .context("invalid relative number")?;
  let unit = caps
    .name("unit")
    .map(|m| m.as_str())
    .ok_or_else(|| {
      anyhow!("missing relative unit")
    })?;

  let shifted = match unit {
    | "d" | "w" => {
      let days = if unit == "w" {
        u64::from(num) * 7
      } else {
        u64::from(num)
      };
      if backwards {
        from.checked_sub_days(Days::new(
          days
        ))
      } else {
        from.checked_add_days(Days::new(
          days
        ))
      }
    }
    | "m" => {
      let months = i32::try_from(num)
        .context(
          "relative month count too \
           large"
        )?;
      Some(shift_months(
        from,
        if backwards {
          -months
        } else {
          months
        }
      ))
    }
    | _ => {
      return Err(anyhow!(
        "unknown relative unit: {unit}"
      ));
    }
  };

  shifted.map(Some).ok_or_else(|| {
    anyhow!(
      "relative date {token} is out \
       of range"
    )
  })
}

/// Moves `date` by whole months, clamping
/// the day to the target month's length.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let target =
    MonthCursor::from_date(date)
      .shift(months);
  let day = date
    .day()
    .min(target.day_count());
  NaiveDate::from_ymd_opt(
    target.year(),
    target.month(),
    day
  )
  .unwrap_or(date)
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday();
  let target_idx =
    target.num_days_from_monday();
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_days(Days::new(
      u64::from(delta)
    ))
    .unwrap_or(from)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}
