use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::ExportError;

static RE_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{2}):(\d{2}(?:\.\d{1,2})?)$").unwrap());

/// Decode an `H:MM:SS.ff` timestamp into seconds.
///
/// Hours are unbounded; minutes and seconds must be two digits and
/// below 60. Anything else is a `BadTimestamp` error.
pub fn parse_timestamp(text: &str) -> Result<f64, ExportError> {
    let bad = || ExportError::BadTimestamp {
        text: text.to_string(),
    };

    let caps = RE_TIMESTAMP.captures(text.trim()).ok_or_else(bad)?;

    let hours: f64 = caps[1].parse().map_err(|_| bad())?;
    let minutes: f64 = caps[2].parse().map_err(|_| bad())?;
    let seconds: f64 = caps[3].parse().map_err(|_| bad())?;

    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(bad());
    }

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Encode seconds as `HH:MM:SS.ff`, the inverse of [`parse_timestamp`].
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds % 3600.0) / 60.0).floor();
    let secs = seconds % 60.0;
    format!("{:02}:{:02}:{:05.2}", hours as u64, minutes as u64, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_timestamp() {
        assert_eq!(parse_timestamp("00:01:30.00").unwrap(), 90.0);
        assert_eq!(parse_timestamp("01:00:00.50").unwrap(), 3600.5);
    }

    #[test]
    fn parses_large_hours() {
        assert_eq!(parse_timestamp("120:00:00.00").unwrap(), 432_000.0);
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert!(parse_timestamp("00:60:00.00").is_err());
        assert!(parse_timestamp("00:00:61.00").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("1:2:3").is_err());
        assert!(parse_timestamp("not a time").is_err());
        assert!(parse_timestamp("00:00").is_err());
    }

    #[test]
    fn formats_with_padding() {
        assert_eq!(format_timestamp(0.0), "00:00:00.00");
        assert_eq!(format_timestamp(90.0), "00:01:30.00");
        assert_eq!(format_timestamp(3661.25), "01:01:01.25");
    }

    #[test]
    fn round_trips_text() {
        for text in ["00:00:00.00", "00:01:30.50", "02:59:59.99", "11:11:11.11"] {
            let secs = parse_timestamp(text).unwrap();
            assert_eq!(format_timestamp(secs), text);
        }
    }

    #[test]
    fn round_trips_seconds() {
        for secs in [0.0, 0.01, 59.99, 61.5, 3599.98, 86_400.25] {
            let back = parse_timestamp(&format_timestamp(secs)).unwrap();
            assert!((back - secs).abs() < 0.01, "{secs} came back as {back}");
        }
    }
}
