// Display formatting for dashboard values.
//
// The community reads the dashboard in Spanish, so numbers use es-ES style
// grouping (dot as the thousands separator).

/// Format a value with thousands separators, rounded to the nearest integer.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format large values with a K/M suffix (one decimal place).
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{}", value.round() as i64)
    }
}

/// Format seconds as `mm:ss`, or `h:mm:ss` once the value crosses an hour.
pub fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Format a 0..1 ratio as a percentage.
pub fn format_percent(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0%".to_string();
    }
    format!("{:.*}%", decimals, value * 100.0)
}
