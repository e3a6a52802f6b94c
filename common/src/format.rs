use chrono::DateTime;
use chrono_tz::Tz;

pub const PLACEHOLDER: &str = "—";

pub fn fmt_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.decimals$}"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Local wall-clock time of an epoch-seconds timestamp, e.g. `9:05 PM`.
pub fn fmt_when(timestamp: Option<i64>, tz: Tz) -> String {
    let Some(ts) = timestamp.filter(|ts| *ts != 0) else {
        return PLACEHOLDER.to_string();
    };
    match DateTime::from_timestamp(ts, 0) {
        Some(utc) => utc.with_timezone(&tz).format("%-I:%M %p").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_wifi(ssid: Option<&str>, connected: Option<bool>) -> String {
    match ssid.filter(|s| !s.is_empty()) {
        Some(ssid) if connected == Some(true) => format!("{ssid} ✓"),
        Some(ssid) => format!("{ssid} ✗"),
        None => format!("{PLACEHOLDER} ✗"),
    }
}

pub fn or_placeholder(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

/// Parses an operator-typed range value; anything non-finite is rejected.
pub fn parse_range_input(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
