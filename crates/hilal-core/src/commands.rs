use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::{Config, DisplaySettings};
use crate::date::MonthCursor;
use crate::datetime::{parse_date_expr, parse_month_expr, today};
use crate::holiday::{HolidayRecord, find_holiday};
use crate::lunar::LunarCalendar;
use crate::render::Renderer;
use crate::view::{MonthView, build_month_view};

const BROWSE_PROMPT: &str = "[n]ext [p]rev [t]oday [q]uit> ";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show",
        "next",
        "prev",
        "holiday",
        "legend",
        "holidays",
        "export",
        "browse",
        "config",
        "_commands",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Everything a command reads: resolved settings, the holiday list, a lunar
/// calendar and the moment the command runs.
pub struct Session<'a> {
    pub settings: DisplaySettings,
    pub holidays: Vec<HolidayRecord>,
    pub lunar: &'a dyn LunarCalendar,
    pub now: DateTime<Utc>,
}

impl Session<'_> {
    pub fn today(&self) -> NaiveDate {
        today(self.now)
    }

    pub fn view(&self, cursor: MonthCursor) -> MonthView {
        build_month_view(
            cursor,
            &self.holidays,
            self.lunar,
            &self.settings,
            self.today(),
        )
    }

    fn month_arg(&self, args: &[String]) -> anyhow::Result<MonthCursor> {
        if args.is_empty() {
            return Ok(MonthCursor::from_date(self.today()));
        }
        let expr = args.join(" ");
        parse_month_expr(&expr, self.now).with_context(|| format!("invalid month '{expr}'"))
    }
}

/// Runs `inv` against the process's stdin and stdout.
#[instrument(skip(session, cfg, renderer, inv))]
pub fn dispatch(
    session: &Session<'_>,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    execute(session, cfg, renderer, &inv, stdin.lock(), &mut out)?;
    out.flush()?;
    Ok(())
}

#[instrument(skip(session, cfg, renderer, input, out))]
pub fn execute<R: BufRead, W: Write>(
    session: &Session<'_>,
    cfg: &Config,
    renderer: &Renderer,
    inv: &Invocation,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();
    debug!(command, args = ?args, "dispatching command");

    match command {
        "show" => cmd_show(session, renderer, session.month_arg(args)?, out),
        "next" => cmd_show(session, renderer, session.month_arg(args)?.next(), out),
        "prev" => cmd_show(session, renderer, session.month_arg(args)?.prev(), out),
        "holiday" => cmd_holiday(session, args, out),
        "legend" => {
            let view = session.view(session.month_arg(args)?);
            renderer.render_legend(out, &view.legend)
        }
        "holidays" => renderer.render_holiday_list(out, &session.holidays, session.settings.lang),
        "export" => cmd_export(session, args, out),
        "browse" => cmd_browse(session, renderer, session.month_arg(args)?, input, out),
        "config" => cmd_config(cfg, out),
        "_commands" => {
            for name in known_command_names() {
                writeln!(out, "{name}")?;
            }
            Ok(())
        }
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_show<W: Write>(
    session: &Session<'_>,
    renderer: &Renderer,
    cursor: MonthCursor,
    out: &mut W,
) -> anyhow::Result<()> {
    let view = session.view(cursor);
    renderer.render_month(out, &view, &session.settings)?;
    if !view.legend.is_empty() {
        writeln!(out)?;
        renderer.render_legend(out, &view.legend)?;
    }
    Ok(())
}

fn cmd_holiday<W: Write>(session: &Session<'_>, args: &[String], out: &mut W) -> anyhow::Result<()> {
    if args.is_empty() {
        return Err(anyhow!("holiday requires a date, e.g. `hilal holiday 2026-03-20`"));
    }
    let expr = args.join(" ");
    let date = parse_date_expr(&expr, session.now)?;

    match find_holiday(date, &session.holidays) {
        Some(holiday) => {
            info!(%date, start = %holiday.start(), "date falls on a holiday");
            writeln!(out, "{}", holiday.display_name(session.settings.lang))?;
        }
        None => writeln!(out, "none")?,
    }
    Ok(())
}

fn cmd_export<W: Write>(session: &Session<'_>, args: &[String], out: &mut W) -> anyhow::Result<()> {
    let view = session.view(session.month_arg(args)?);
    let json = serde_json::to_string_pretty(&view).context("failed to serialize month view")?;
    writeln!(out, "{json}")?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Next,
    Prev,
    Today,
    Quit,
}

/// Arrow keys arrive as `ESC [ C` / `ESC [ D` on a line-buffered terminal.
pub fn parse_nav_key(line: &str) -> Option<NavKey> {
    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "next" | ">" | "l" | "\x1b[c" => Some(NavKey::Next),
        "p" | "prev" | "<" | "h" | "\x1b[d" => Some(NavKey::Prev),
        "t" | "today" => Some(NavKey::Today),
        "q" | "quit" | "exit" => Some(NavKey::Quit),
        _ => None,
    }
}

#[instrument(skip(session, renderer, input, out))]
fn cmd_browse<R: BufRead, W: Write>(
    session: &Session<'_>,
    renderer: &Renderer,
    start: MonthCursor,
    mut input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    let home = MonthCursor::from_date(session.today());
    let mut cursor = start;
    let mut redraw = true;

    loop {
        if redraw {
            cmd_show(session, renderer, cursor, out)?;
        }
        write!(out, "{BROWSE_PROMPT}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        redraw = true;
        match parse_nav_key(&line) {
            Some(NavKey::Next) => cursor = cursor.next(),
            Some(NavKey::Prev) => cursor = cursor.prev(),
            Some(NavKey::Today) => cursor = home,
            Some(NavKey::Quit) => break,
            None => {
                redraw = false;
                if !line.trim().is_empty() {
                    writeln!(out, "unknown key '{}'", line.trim())?;
                }
            }
        }
        debug!(month = %cursor, "browse position");
    }

    Ok(())
}

fn cmd_config<W: Write>(cfg: &Config, out: &mut W) -> anyhow::Result<()> {
    for path in &cfg.loaded_files {
        writeln!(out, "# {}", path.display())?;
    }
    let sorted: BTreeMap<_, _> = cfg.iter().collect();
    for (k, v) in sorted {
        writeln!(out, "{k}={v}")?;
    }
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "usage: hilal [options] [command] [args]

commands:
  show [MONTH]      month grid with Hijri days and holidays (default)
  next [MONTH]      the month after MONTH
  prev [MONTH]      the month before MONTH
  holiday DATE      holiday on DATE, or `none`
  legend [MONTH]    holidays listed under MONTH
  holidays          every configured holiday
  export [MONTH]    month view as JSON
  browse [MONTH]    step through months from stdin (n, p, t, q)
  config            effective settings
  help, version

MONTH accepts YYYY-MM, +N/-N months from now, or any DATE.
DATE accepts today, tomorrow, YYYY-MM-DD, weekday and month names, +Nd/+Nw/+Nm.
Overrides: --rc key=value, rc.key=value, rc.key:value"
    )?;
    Ok(())
}
