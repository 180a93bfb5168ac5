use std::path::Path;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::ExportError;
use crate::core::runner::ENGINE;
use crate::core::timecode::parse_timestamp;

static RE_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d+:\d{2}:\d{2}\.\d{2})").unwrap());
static RE_RESOLUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2,5})x(\d{2,5})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    FourThirds,
    SixteenNinths,
    Other,
}

impl AspectRatio {
    /// Classify a frame size, tolerating slight ratio drift from odd
    /// dimensions.
    pub fn classify(width: u32, height: u32) -> AspectRatio {
        if height == 0 {
            return AspectRatio::Other;
        }
        let ratio = width as f64 / height as f64;
        if (ratio - 4.0 / 3.0).abs() < 0.01 {
            AspectRatio::FourThirds
        } else if (ratio - 16.0 / 9.0).abs() < 0.01 {
            AspectRatio::SixteenNinths
        } else {
            AspectRatio::Other
        }
    }

    /// Height matching this ratio for a chosen width, when the ratio
    /// is a known one.
    pub fn derive_height(&self, width: u32) -> Option<u32> {
        match self {
            AspectRatio::FourThirds => Some(width * 3 / 4),
            AspectRatio::SixteenNinths => Some(width * 9 / 16),
            AspectRatio::Other => None,
        }
    }

    pub fn derive_width(&self, height: u32) -> Option<u32> {
        match self {
            AspectRatio::FourThirds => Some(height * 4 / 3),
            AspectRatio::SixteenNinths => Some(height * 16 / 9),
            AspectRatio::Other => None,
        }
    }

    /// Ready-made resolution choices offered for this ratio.
    pub fn suggested_resolutions(&self) -> &'static [&'static str] {
        match self {
            AspectRatio::FourThirds => &["640x480", "800x600", "1024x768"],
            AspectRatio::SixteenNinths => &["1280x720", "1920x1080", "2560x1440"],
            AspectRatio::Other => &[],
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AspectRatio::FourThirds => write!(f, "4:3"),
            AspectRatio::SixteenNinths => write!(f, "16:9"),
            AspectRatio::Other => write!(f, "other"),
        }
    }
}

/// Run the engine in inspect-only mode and hand back its diagnostic
/// text. Without an output file the engine exits non-zero after
/// printing the input description; that is expected here.
fn inspect(path: &Path) -> Result<String, ExportError> {
    let output = Command::new(ENGINE)
        .arg("-i")
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExportError::BinaryNotFound
            } else {
                ExportError::SpawnFailed {
                    message: e.to_string(),
                }
            }
        })?;
    Ok(String::from_utf8_lossy(&output.stderr).to_string())
}

/// Total duration of a media file in seconds, if the engine reports
/// one.
pub fn media_duration(path: &Path) -> Result<Option<f64>, ExportError> {
    Ok(duration_from_text(&inspect(path)?))
}

/// Frame size of a media file, if the engine reports one.
pub fn media_resolution(path: &Path) -> Result<Option<(u32, u32)>, ExportError> {
    Ok(resolution_from_text(&inspect(path)?))
}

pub fn media_aspect_ratio(path: &Path) -> Result<Option<AspectRatio>, ExportError> {
    Ok(media_resolution(path)?.map(|(w, h)| AspectRatio::classify(w, h)))
}

/// First line of `ffmpeg -version`, used as an availability check.
pub fn engine_version() -> Result<String, ExportError> {
    let output = Command::new(ENGINE).arg("-version").output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExportError::BinaryNotFound
        } else {
            ExportError::SpawnFailed {
                message: e.to_string(),
            }
        }
    })?;
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(text.lines().next().unwrap_or_default().to_string())
}

fn duration_from_text(text: &str) -> Option<f64> {
    let caps = RE_DURATION.captures(text)?;
    parse_timestamp(&caps[1]).ok()
}

fn resolution_from_text(text: &str) -> Option<(u32, u32)> {
    let caps = RE_RESOLUTION.captures(text)?;
    let width = caps[1].parse().ok()?;
    let height = caps[2].parse().ok()?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mp4':
  Duration: 00:02:00.50, start: 0.000000, bitrate: 5305 kb/s
    Stream #0:0(und): Video: h264 (High), yuv420p, 1920x1080, 5108 kb/s, 30 fps";

    #[test]
    fn duration_scanned_from_inspect_output() {
        assert_eq!(duration_from_text(SAMPLE), Some(120.5));
        assert_eq!(duration_from_text("no media here"), None);
    }

    #[test]
    fn resolution_scanned_from_inspect_output() {
        assert_eq!(resolution_from_text(SAMPLE), Some((1920, 1080)));
        assert_eq!(resolution_from_text("audio only"), None);
    }

    #[test]
    fn classifies_common_ratios() {
        assert_eq!(AspectRatio::classify(640, 480), AspectRatio::FourThirds);
        assert_eq!(AspectRatio::classify(1920, 1080), AspectRatio::SixteenNinths);
        assert_eq!(AspectRatio::classify(1280, 1024), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(100, 0), AspectRatio::Other);
    }

    #[test]
    fn tolerates_near_miss_ratios() {
        // 1366x768 is marketed as 16:9 but is off by a hair.
        assert_eq!(AspectRatio::classify(1366, 768), AspectRatio::SixteenNinths);
    }

    #[test]
    fn derives_constrained_dimensions() {
        assert_eq!(AspectRatio::FourThirds.derive_height(640), Some(480));
        assert_eq!(AspectRatio::SixteenNinths.derive_height(1280), Some(720));
        assert_eq!(AspectRatio::SixteenNinths.derive_width(1080), Some(1920));
        assert_eq!(AspectRatio::Other.derive_height(640), None);
    }
}
