use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::color::{Rgb, parse_hex_color};
use crate::config::{Config, DisplaySettings};
use crate::holiday::HolidayRecord;
use crate::locale::Lang;
use crate::view::{DayCell, HolidayBadge, MonthView};

const LEGEND_MARK: &str = "■";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    /// Forces escape sequences on or off regardless of the terminal.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[tracing::instrument(skip(self, out, view, settings), fields(month = %view.month))]
    pub fn render_month<W: Write>(
        &self,
        out: &mut W,
        view: &MonthView,
        settings: &DisplaySettings,
    ) -> anyhow::Result<()> {
        let weeks = view.weeks();
        let texts: Vec<Vec<Option<String>>> = weeks
            .iter()
            .map(|row| {
                row.iter()
                    .map(|slot| slot.map(|cell| self.cell_text(cell, settings)))
                    .collect()
            })
            .collect();

        let width = view
            .weekdays
            .iter()
            .map(|label| UnicodeWidthStr::width(label.as_str()))
            .chain(
                texts
                    .iter()
                    .flatten()
                    .flatten()
                    .map(|text| visible_width(text)),
            )
            .max()
            .unwrap_or(2);
        let grid_width = width * 7 + 6;

        let gregorian = self.paint(&view.gregorian_title, &settings.gregorian_color.fg_code());
        let hijri = self.paint(&view.hijri_title, &settings.hijri_color.fg_code());
        writeln!(out, "{}", center(&gregorian, grid_width))?;
        writeln!(out, "{}", center(&hijri, grid_width))?;
        writeln!(out)?;

        let mut labels: Vec<String> = view.weekdays.clone();
        if settings.rtl {
            labels.reverse();
        }
        write_row(out, labels.iter().map(String::as_str), width)?;

        for mut row in texts {
            if settings.rtl {
                row.reverse();
            }
            write_row(out, row.iter().map(|t| t.as_deref().unwrap_or("")), width)?;
        }

        Ok(())
    }

    pub fn render_legend<W: Write>(
        &self,
        out: &mut W,
        legend: &[HolidayBadge],
    ) -> anyhow::Result<()> {
        for badge in legend {
            let mark = match parse_hex_color(&badge.color) {
                Some(rgb) => self.paint(LEGEND_MARK, &rgb.fg_code()),
                None => LEGEND_MARK.to_string(),
            };
            writeln!(out, "{mark} {}", badge.name)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, holidays))]
    pub fn render_holiday_list<W: Write>(
        &self,
        out: &mut W,
        holidays: &[HolidayRecord],
        lang: Lang,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Name".to_string(),
            "Color".to_string(),
        ];

        let rows = holidays
            .iter()
            .enumerate()
            .map(|(idx, holiday)| {
                let color = match parse_hex_color(holiday.color()) {
                    Some(rgb) => self.paint(holiday.color(), &rgb.fg_code()),
                    None => holiday.color().to_string(),
                };
                vec![
                    (idx + 1).to_string(),
                    holiday.start().format("%Y-%m-%d").to_string(),
                    holiday.end().format("%Y-%m-%d").to_string(),
                    holiday.display_name(lang).to_string(),
                    color,
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    fn cell_text(&self, cell: &DayCell, settings: &DisplaySettings) -> String {
        let background: Option<Rgb> = match &cell.holiday {
            Some(badge) => parse_hex_color(&badge.color),
            None if cell.is_today => Some(settings.today_color),
            None => None,
        };
        let with_bg = |fg: &Rgb| match background {
            Some(bg) => format!("{};{}", fg.fg_code(), bg.bg_code()),
            None => fg.fg_code(),
        };

        let day = self.paint(&cell.day.to_string(), &with_bg(&settings.gregorian_color));
        let hijri = self.paint(&cell.hijri_day.to_string(), &with_bg(&settings.hijri_color));
        let slash = match background {
            Some(bg) => self.paint("/", &bg.bg_code()),
            None => "/".to_string(),
        };
        format!("{day}{slash}{hijri}")
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_row<'a, W: Write>(
    out: &mut W,
    cells: impl Iterator<Item = &'a str>,
    width: usize,
) -> anyhow::Result<()> {
    let padded: Vec<String> = cells
        .map(|cell| {
            let padding = width.saturating_sub(visible_width(cell));
            format!("{}{}", " ".repeat(padding), cell)
        })
        .collect();
    writeln!(out, "{}", padded.join(" ").trim_end())?;
    Ok(())
}

fn center(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(visible_width(text)) / 2;
    format!("{}{}", " ".repeat(padding), text)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(visible_width(cell));
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect();
    writeln!(writer, "{}", header_line.join(" ").trim_end())?;

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(writer, "{}", rule.join(" "))?;

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let padding = width.saturating_sub(visible_width(cell));
                format!("{}{}", cell, " ".repeat(padding))
            })
            .collect();
        writeln!(writer, "{}", line.join(" ").trim_end())?;
    }

    Ok(())
}

fn visible_width(s: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(s).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::date::MonthCursor;
    use crate::lunar::tests::TableCalendar;
    use crate::view::build_month_view;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn settings(lang: &str, rtl: bool) -> DisplaySettings {
        let mut cfg = Config::defaults();
        cfg.apply_overrides(vec![
            ("lang".to_string(), lang.to_string()),
            ("layout.rtl".to_string(), if rtl { "on" } else { "off" }.to_string()),
        ]);
        cfg.display_settings().expect("valid settings")
    }

    fn founding_day() -> HolidayRecord {
        HolidayRecord::new(
            BTreeMap::from([("en".to_string(), "Founding Day".to_string())]),
            ymd(2026, 2, 21),
            ymd(2026, 2, 21),
            "#938953",
        )
        .expect("valid holiday")
    }

    fn february(settings: &DisplaySettings) -> MonthView {
        let mut calendar = TableCalendar::default();
        for (offset, date) in MonthCursor::new(2026, 2).expect("month").days().enumerate() {
            calendar = calendar.with(date, 1447, 8, 13 + offset as u32);
        }
        build_month_view(
            MonthCursor::new(2026, 2).expect("month"),
            &[founding_day()],
            &calendar,
            settings,
            ymd(2026, 2, 10),
        )
    }

    fn plain() -> Renderer {
        Renderer { color: false }
    }

    fn render(renderer: &Renderer, view: &MonthView, settings: &DisplaySettings) -> String {
        let mut buf = Vec::new();
        renderer
            .render_month(&mut buf, view, settings)
            .expect("render month");
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn plain_grid_starts_on_sunday() {
        let settings = settings("en", false);
        let text = render(&plain(), &february(&settings), &settings);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0].trim(), "February 2026");
        assert_eq!(lines[1].trim(), "Sha'ban 1447");
        assert!(lines[3].trim_start().starts_with("SUN"), "{text}");
        assert!(lines[3].ends_with("SAT"), "{text}");
        assert!(lines[4].trim_start().starts_with("1/13"), "{text}");
        assert!(lines[4].ends_with("7/19"), "{text}");
        // four full weeks
        assert_eq!(lines.len(), 8);
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn rtl_reverses_each_row() {
        let settings = settings("en", true);
        let text = render(&plain(), &february(&settings), &settings);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[3].trim_start().starts_with("SAT"), "{text}");
        assert!(lines[3].ends_with("SUN"), "{text}");
        assert!(lines[4].ends_with("1/13"), "{text}");
    }

    #[test]
    fn columns_share_one_width() {
        let settings = settings("ar", true);
        let text = render(&plain(), &february(&settings), &settings);
        let widths: Vec<usize> = text
            .lines()
            .skip(3)
            .map(|line| UnicodeWidthStr::width(line))
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{text}");
    }

    #[test]
    fn colored_cells_use_holiday_and_today_backgrounds() {
        let settings = settings("en", false);
        let text = render(&plain().with_color(true), &february(&settings), &settings);
        // holiday background from #938953
        assert!(text.contains("48;2;147;137;83"), "{text}");
        // today background from #DEB758
        assert!(text.contains("48;2;222;183;88"), "{text}");
        assert_eq!(strip_ansi(&text), render(&plain(), &february(&settings), &settings));
    }

    #[test]
    fn legend_lines_carry_marks() {
        let mut buf = Vec::new();
        plain()
            .render_legend(
                &mut buf,
                &[HolidayBadge {
                    name: "Founding Day".to_string(),
                    color: "#938953".to_string(),
                }],
            )
            .expect("legend");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "■ Founding Day\n");
    }

    #[test]
    fn holiday_list_is_a_table() {
        let mut buf = Vec::new();
        plain()
            .render_holiday_list(&mut buf, &[founding_day()], Lang::En)
            .expect("list");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("# Start"), "{text}");
        assert_eq!(lines[2], "1 2026-02-21 2026-02-21 Founding Day #938953");
    }

    #[test]
    fn color_flag_uses_config_booleans() {
        let mut cfg = Config::defaults();
        cfg.apply_overrides(vec![("color".to_string(), "y".to_string())]);
        assert!(Renderer::new(&cfg).is_ok());

        cfg.apply_overrides(vec![("rc.color".to_string(), "n".to_string())]);
        let renderer = Renderer::new(&cfg).expect("color off");
        assert!(!renderer.color);

        cfg.apply_overrides(vec![("color".to_string(), "sometimes".to_string())]);
        let err = Renderer::new(&cfg).expect_err("not a boolean");
        assert!(err.to_string().contains("'color'"), "{err}");
    }

    #[test]
    fn strip_ansi_keeps_text() {
        assert_eq!(strip_ansi("\x1b[38;2;1;2;3m21\x1b[0m/4"), "21/4");
    }
}
