//! Presentation policy shared by the spreadsheet and slide-deck writers.
//! Aggregation code never deals with colors, fonts or number layouts.

use num_format::{Locale, ToFormattedString};

/// Excel number format for plain amounts.
pub const NUMBER_FORMAT: &str = "#,##0";
/// Excel number format for percentage columns (values already scaled to 0-100).
pub const PERCENT_FORMAT: &str = "0.0";

pub const HEADER_FILL: u32 = 0x1F4E79;
pub const HEADER_FONT: u32 = 0xFFFFFF;
pub const BAND_FILL: u32 = 0xF2F2F2;
pub const TOTAL_FILL: u32 = 0xD9E1F2;
pub const TILE_FILL: u32 = 0xDEEAF6;
pub const TEXT_COLOR: u32 = 0x262626;

pub fn hex_color(rgb: u32) -> String {
    format!("{:06X}", rgb & 0xFF_FFFF)
}

/// Thousands-separated, no decimals: `1234567.6` -> `"1,234,568"`.
pub fn format_number(value: f64) -> String {
    format_decimal(value, 0)
}

/// Percentage with one decimal: `37.54` -> `"37.5%"`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_decimal(value, 1))
}

/// Thousands-separated with `places` decimals.
pub fn format_decimal(value: f64, places: usize) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let rendered = format!("{:.*}", places, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());

    // A value that rounds to zero prints without a sign.
    let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.4), "999");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(1_234_567.6), "1,234,568");
        assert_eq!(format_number(-98_765.0), "-98,765");
        assert_eq!(format_number(-0.2), "0");
    }

    #[test]
    fn test_format_percent_and_decimal() {
        assert_eq!(format_percent(37.54), "37.5%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_decimal(12345.678, 2), "12,345.68");
        assert_eq!(format_decimal(f64::NAN, 2), "-");
        assert_eq!(format_decimal(-0.004, 2), "0.00");
        assert_eq!(format_decimal(-1_234_567.891, 1), "-1,234,567.9");
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color(HEADER_FILL), "1F4E79");
        assert_eq!(hex_color(0xFF), "0000FF");
    }
}
