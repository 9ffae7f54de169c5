//! Display formatting for fetched values.

/// Render `value` for people: percentages, abbreviated money and counts,
/// or a grouped decimal.
pub fn format_value(value: f64, unit: &str, code: &str) -> String {
    let unit_lower = unit.to_lowercase();
    let is_percent = code.ends_with(".ZS") || code.ends_with(".ZG") || unit.contains('%');
    let is_money = code.ends_with(".CD")
        || code.ends_with(".KD")
        || unit.contains("US$")
        || unit_lower.contains("dollar");
    let is_count = code.ends_with(".IN") || unit_lower.contains("number");

    if is_percent {
        return format!("{:.2}%", value);
    }

    let abs = value.abs();
    if is_money {
        return match abs {
            a if a >= 1e12 => format!("${:.2}T", value / 1e12),
            a if a >= 1e9 => format!("${:.2}B", value / 1e9),
            a if a >= 1e6 => format!("${:.2}M", value / 1e6),
            _ => format!("${}", group_thousands(value)),
        };
    }

    if is_count {
        match abs {
            a if a >= 1e9 => return format!("{:.2}B", value / 1e9),
            a if a >= 1e6 => return format!("{:.2}M", value / 1e6),
            a if a >= 1e3 => return format!("{:.2}k", value / 1e3),
            _ => {}
        }
    }

    group_thousands(value)
}

/// Two decimals with comma thousands separators: `-1234567.891` -> `-1,234,567.89`.
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(format_value(11.456, "", "SL.UEM.TOTL.ZS"), "11.46%");
        assert_eq!(format_value(-2.5, "", "NY.GDP.MKTP.KD.ZG"), "-2.50%");
        assert_eq!(format_value(3.0, "% of GDP", "X.Y"), "3.00%");
    }

    #[test]
    fn test_money() {
        assert_eq!(format_value(2.1e13, "", "NY.GDP.MKTP.CD"), "$21.00T");
        assert_eq!(format_value(2.17e10, "", "NY.GDP.MKTP.CD"), "$21.70B");
        assert_eq!(format_value(4.5e6, "", "NY.GDP.MKTP.KD"), "$4.50M");
        assert_eq!(format_value(4098.5, "current US$", "NY.GDP.PCAP.XX"), "$4,098.50");
    }

    #[test]
    fn test_counts() {
        assert_eq!(format_value(1.4e9, "", "SP.POP.TOTL.IN"), "1.40B");
        assert_eq!(format_value(5_489_739.0, "number", "SP.POP.TOTL"), "5.49M");
        assert_eq!(format_value(1200.0, "number", "X"), "1.20k");
        assert_eq!(format_value(12.0, "number", "X"), "12.00");
    }

    #[test]
    fn test_plain_grouping() {
        assert_eq!(format_value(1234567.891, "", "SP.POP.TOTL"), "1,234,567.89");
        assert_eq!(format_value(-1234.5, "", "X"), "-1,234.50");
        assert_eq!(format_value(999.999, "", "X"), "1,000.00");
        assert_eq!(format_value(-0.001, "", "X"), "0.00");
    }
}
