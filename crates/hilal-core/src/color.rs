use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Escape sequence for this color as 24-bit foreground.
    pub fn fg_code(&self) -> String {
        format!("38;2;{};{};{}", self.r, self.g, self.b)
    }

    pub fn bg_code(&self) -> String {
        format!("48;2;{};{};{}", self.r, self.g, self.b)
    }
}

/// Parses `#rgb` or `#rrggbb` (case-insensitive). `#rgb` doubles each digit
/// the way CSS does.
pub fn parse_hex_color(input: &str) -> Option<Rgb> {
    let hex_re = Regex::new(r"^#(?P<hex>[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").ok()?;
    let captures = hex_re.captures(input.trim())?;
    let hex = captures.name("hex")?.as_str();

    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
    if hex.len() == 3 {
        let mut out = [0u8; 3];
        for (slot, digit) in out.iter_mut().zip(hex.chars()) {
            let doubled: String = [digit, digit].iter().collect();
            *slot = channel(&doubled)?;
        }
        return Some(Rgb {
            r: out[0],
            g: out[1],
            b: out[2],
        });
    }

    Some(Rgb {
        r: channel(&hex[0..2])?,
        g: channel(&hex[2..4])?,
        b: channel(&hex[4..6])?,
    })
}
