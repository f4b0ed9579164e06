//! Pure conversions between token text and typed values.

use crate::error::{WfError, WfResult};

/// Named colors accepted by [`parse_color`], as `0xRRGGBB`.
///
/// Names are matched case-insensitively with spaces removed, so `"Dark Gray"`
/// and `"darkgray"` are the same color.
pub const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xFFFFFF),
    ("red", 0xFF0000),
    ("green", 0x00FF00),
    ("blue", 0x0000FF),
    ("yellow", 0xFFFF00),
    ("cyan", 0x00FFFF),
    ("magenta", 0xFF00FF),
    ("gray", 0xBEBEBE),
    ("grey", 0xBEBEBE),
    ("darkgray", 0xA9A9A9),
    ("darkgrey", 0xA9A9A9),
    ("lightgray", 0xD3D3D3),
    ("lightgrey", 0xD3D3D3),
    ("darkred", 0x8B0000),
    ("darkgreen", 0x006400),
    ("darkblue", 0x00008B),
    ("orange", 0xFFA500),
    ("purple", 0xA020F0),
    ("brown", 0xA52A2A),
    ("pink", 0xFFC0CB),
    ("navy", 0x000080),
    ("gold", 0xFFD700),
];

/// Parse an integer. Integral floats such as `3.0` or `1e3` are accepted.
pub fn parse_int(text: &str) -> WfResult<i64> {
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(WfError::ValueParse {
            expected: "integer",
            text: text.to_string(),
        }),
    }
}

/// Parse a floating-point number.
pub fn parse_float(text: &str) -> WfResult<f64> {
    text.trim().parse::<f64>().map_err(|_| WfError::ValueParse {
        expected: "number",
        text: text.to_string(),
    })
}

/// Format a float so that parsing it back yields the same value.
pub fn format_float(value: f64) -> String {
    format!("{value}")
}

/// Parse a color name or a `#RRGGBB` literal into `0xRRGGBB`.
pub fn parse_color(text: &str) -> WfResult<u32> {
    let trimmed = text.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).map_err(|_| WfError::ColorParse(text.to_string()));
        }
        return Err(WfError::ColorParse(text.to_string()));
    }

    let key: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, rgb)| *rgb)
        .ok_or_else(|| WfError::ColorParse(text.to_string()))
}

/// Returns `true` if `text` lexes as a single number token.
///
/// Grammar: `[+-]? (digits ('.' digits?)? | '.' digits) ([eE] [+-]? digits)?`.
pub fn is_number_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

/// Returns `true` if `text` lexes as a single bare word.
pub fn is_bare_word(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_accepts_signs_and_integral_floats() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("-7"), Ok(-7));
        assert_eq!(parse_int("+3"), Ok(3));
        assert_eq!(parse_int("3.0"), Ok(3));
        assert_eq!(parse_int("1e3"), Ok(1000));
    }

    #[test]
    fn int_rejects_fractions_and_words() {
        assert!(matches!(
            parse_int("2.5"),
            Err(WfError::ValueParse { expected: "integer", .. })
        ));
        assert!(parse_int("seven").is_err());
    }

    #[test]
    fn float_parses_numeric_grammar() {
        assert_eq!(parse_float("1.5"), Ok(1.5));
        assert_eq!(parse_float("-2e-3"), Ok(-0.002));
        assert_eq!(parse_float(".5"), Ok(0.5));
        assert!(parse_float("wide").is_err());
    }

    #[test]
    fn format_float_round_trips() {
        for v in [0.0, 1.0, -0.25, 123.456, 1.0 / 3.0, 1e-7] {
            assert_eq!(parse_float(&format_float(v)), Ok(v));
        }
        assert_eq!(format_float(2.0), "2");
    }

    #[test]
    fn named_colors() {
        assert_eq!(parse_color("black"), Ok(0x000000));
        assert_eq!(parse_color("Red"), Ok(0xFF0000));
        assert_eq!(parse_color("dark gray"), Ok(0xA9A9A9));
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_color("#00ff80"), Ok(0x00FF80));
        assert!(parse_color("#00ff8").is_err());
        assert!(parse_color("#zzzzzz").is_err());
    }

    #[test]
    fn unknown_color_is_an_error() {
        assert_eq!(
            parse_color("chartreuse-ish"),
            Err(WfError::ColorParse("chartreuse-ish".to_string()))
        );
    }

    #[test]
    fn number_literals() {
        for ok in ["1", "-2", "+3.5", ".5", "5.", "1e3", "2.5E-4", "0"] {
            assert!(is_number_literal(ok), "{ok}");
        }
        for bad in ["", "-", ".", "1e", "e5", "1.2.3", "NaN", "inf", "12a"] {
            assert!(!is_number_literal(bad), "{bad}");
        }
    }

    #[test]
    fn bare_words() {
        assert!(is_bare_word("black"));
        assert!(is_bare_word("_x.y-z"));
        assert!(!is_bare_word("two words"));
        assert!(!is_bare_word("9lives"));
        assert!(!is_bare_word(""));
    }
}
