use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::color::{
  Rgb,
  parse_hex_color
};
use crate::datetime::parse_weekday_name;
use crate::holiday::{
  HolidayRecord,
  VisibilityOptions,
  default_holidays,
  load_holiday_file
};
use crate::locale::Lang;

const RC_ENV_VAR: &str = "HILALRC";
const RC_FILE_NAME: &str = ".hilalrc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

/// Everything the month view needs from
/// configuration, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
  pub lang:            Lang,
  pub gregorian_color: Rgb,
  pub hijri_color:     Rgb,
  pub today_color:     Rgb,
  pub visibility:      VisibilityOptions,
  pub week_start:      Weekday,
  pub rtl:             bool
}

impl Config {
  /// Built-in values, before any rc file
  /// or override.
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    for (key, value) in [
      ("lang", "ar"),
      ("color", "on"),
      ("color.gregorian", "#444"),
      ("color.hijri", "#2F6F4E"),
      ("color.today", "#DEB758"),
      ("holidays.carryover", "on"),
      ("weekstart", "sunday")
    ] {
      cfg
        .map
        .insert(key.to_string(), value.to_string());
    }

    cfg
  }

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::defaults();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(hilalrc = %path.display(), "loading hilalrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no hilalrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// `None` when unset; an error when set
  /// to something that is not a boolean.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid '{key}' setting: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn lang(
    &self
  ) -> anyhow::Result<Lang> {
    let raw = self
      .get("lang")
      .unwrap_or_else(|| "ar".to_string());
    raw
      .parse::<Lang>()
      .context("invalid 'lang' setting")
  }

  fn color(
    &self,
    key: &str
  ) -> anyhow::Result<Rgb> {
    let raw =
      self.get(key).ok_or_else(|| {
        anyhow!("missing '{key}' setting")
      })?;
    parse_hex_color(&raw).ok_or_else(
      || {
        anyhow!(
          "invalid '{key}' setting \
           '{raw}': expected #rgb or \
           #rrggbb"
        )
      }
    )
  }

  #[tracing::instrument(skip(self))]
  pub fn display_settings(
    &self
  ) -> anyhow::Result<DisplaySettings> {
    let lang = self.lang()?;

    let week_start_raw = self
      .get("weekstart")
      .unwrap_or_else(|| {
        "sunday".to_string()
      })
      .to_ascii_lowercase();
    let week_start =
      parse_weekday_name(&week_start_raw)
        .ok_or_else(|| {
          anyhow!(
            "invalid 'weekstart' \
             setting: {week_start_raw}"
          )
        })?;

    let settings = DisplaySettings {
      lang,
      gregorian_color: self
        .color("color.gregorian")?,
      hijri_color: self
        .color("color.hijri")?,
      today_color: self
        .color("color.today")?,
      visibility: VisibilityOptions {
        allow_carry_over: self
          .get_bool("holidays.carryover")?
          .unwrap_or(true)
      },
      week_start,
      rtl: self
        .get_bool("layout.rtl")?
        .unwrap_or_else(|| lang.is_rtl())
    };
    debug!(?settings, "resolved display settings");
    Ok(settings)
  }

  /// The configured holiday file, or the
  /// built-in list when none is set.
  #[tracing::instrument(skip(self))]
  pub fn holidays(
    &self
  ) -> anyhow::Result<Vec<HolidayRecord>>
  {
    match self.get("holidays.file") {
      | Some(raw)
        if !raw.trim().is_empty() =>
      {
        let path =
          expand_tilde(Path::new(raw.trim()));
        load_holiday_file(&path)
      }
      | _ => {
        debug!(
          "no holidays.file set; using \
           built-in list"
        );
        default_holidays()
      }
    }
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            strip_trailing_comment(
              include_rest
            )
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let mut value =
        strip_trailing_comment(v)
          .to_string();
      if key == "holidays.file" {
        value = resolve_relative(
          &base_dir, &value
        );
      }
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

/// Drops a ` # comment` tail. The first
/// character is never a comment start so
/// that colors such as `#444` survive.
fn strip_trailing_comment(
  text: &str
) -> &str {
  let text = text.trim();
  let first_len = text
    .chars()
    .next()
    .map_or(0, char::len_utf8);
  match text[first_len..].find(" #") {
    | Some(idx) => {
      text[..first_len + idx].trim()
    }
    | None => text
  }
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn resolve_relative(
  base_dir: &Path,
  value: &str
) -> String {
  if value.is_empty() {
    return String::new();
  }
  let expanded =
    expand_tilde(Path::new(value));
  if expanded.is_absolute() {
    expanded.display().to_string()
  } else {
    base_dir
      .join(expanded)
      .display()
      .to_string()
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}
