use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::timecode::parse_timestamp;

static RE_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d+:\d{2}:\d{2}\.\d{2})").unwrap());
static RE_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"time=(\d+:\d{2}:\d{2}\.\d{2})").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub current_seconds: f64,
    pub total_seconds: Option<f64>,
    /// In [0, 100]. `None` while the total is unknown or zero, which is
    /// distinct from a 0% update at the start of a job.
    pub percentage: Option<f64>,
}

/// Incremental scanner for one job's diagnostic stream.
///
/// Feed it stderr lines as they arrive; it discovers the total duration
/// from the first `Duration:` line (unless pre-seeded) and reports the
/// position from each `time=` line. Lines matching neither pattern, and
/// timestamps that fail to decode, are ignored.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total_seconds: Option<f64>,
    current_seconds: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the total, e.g. a trim job already knows the span it
    /// writes. `Duration:` lines are ignored afterwards.
    pub fn with_total(total_seconds: f64) -> Self {
        ProgressTracker {
            total_seconds: Some(total_seconds),
            current_seconds: 0.0,
        }
    }

    pub fn feed(&mut self, line: &str) -> Option<ProgressUpdate> {
        if self.total_seconds.is_none() {
            if let Some(caps) = RE_DURATION.captures(line) {
                if let Ok(total) = parse_timestamp(&caps[1]) {
                    self.total_seconds = Some(total);
                    return Some(self.update());
                }
                return None;
            }
        }

        let caps = RE_TIME.captures(line)?;
        let current = parse_timestamp(&caps[1]).ok()?;
        self.current_seconds = current;
        Some(self.update())
    }

    fn update(&self) -> ProgressUpdate {
        let percentage = match self.total_seconds {
            Some(total) if total > 0.0 => {
                Some((self.current_seconds / total * 100.0).clamp(0.0, 100.0))
            }
            _ => None,
        };
        ProgressUpdate {
            current_seconds: self.current_seconds,
            total_seconds: self.total_seconds,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_then_time_reports_percentage() {
        let mut tracker = ProgressTracker::new();

        let first = tracker
            .feed("  Duration: 00:01:30.00, start: 0.000000, bitrate: 5000 kb/s")
            .unwrap();
        assert_eq!(first.current_seconds, 0.0);
        assert_eq!(first.total_seconds, Some(90.0));
        assert_eq!(first.percentage, Some(0.0));

        let second = tracker
            .feed("frame= 1000 fps=100 q=28.0 size=1024kB time=00:00:45.00 bitrate=1000kbits/s")
            .unwrap();
        assert_eq!(second.current_seconds, 45.0);
        assert_eq!(second.percentage, Some(50.0));
    }

    #[test]
    fn unrelated_line_yields_nothing() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.feed("Stream mapping:").is_none());
        assert!(tracker.feed("").is_none());
    }

    #[test]
    fn time_without_total_is_indeterminate() {
        let mut tracker = ProgressTracker::new();
        let update = tracker.feed("time=00:00:10.00 bitrate=N/A").unwrap();
        assert_eq!(update.current_seconds, 10.0);
        assert_eq!(update.percentage, None);
    }

    #[test]
    fn seeded_total_ignores_duration_lines() {
        let mut tracker = ProgressTracker::with_total(10.0);
        assert!(tracker.feed("  Duration: 00:10:00.00, start: 0.000000").is_none());

        let update = tracker.feed("time=00:00:05.00").unwrap();
        assert_eq!(update.total_seconds, Some(10.0));
        assert_eq!(update.percentage, Some(50.0));
    }

    #[test]
    fn percentage_clamped_to_hundred() {
        let mut tracker = ProgressTracker::with_total(10.0);
        let update = tracker.feed("time=00:00:15.00").unwrap();
        assert_eq!(update.percentage, Some(100.0));
    }

    #[test]
    fn zero_total_stays_indeterminate() {
        let mut tracker = ProgressTracker::with_total(0.0);
        let update = tracker.feed("time=00:00:05.00").unwrap();
        assert_eq!(update.percentage, None);
    }

    #[test]
    fn out_of_range_timestamp_ignored() {
        let mut tracker = ProgressTracker::new();
        // Looks like a duration but minutes are out of range.
        assert!(tracker.feed("Duration: 00:99:00.00").is_none());

        // The bad line must not have fixed the total.
        let update = tracker.feed("time=00:00:05.00").unwrap();
        assert_eq!(update.total_seconds, None);
        assert_eq!(update.percentage, None);
    }
}
