use std::path::PathBuf;

/// Target container for an export.
///
/// `KeepOriginal` reuses the input file's extension. Named formats are
/// the values offered to the user, including the aliases that pin a
/// codec ("mp4 (h264)", "mp4 (h265)"); a plain container name leaves
/// codec choice to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetFormat {
    KeepOriginal,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unchanged,
    /// A ready-made `WIDTHxHEIGHT` choice, passed through verbatim.
    Preset(String),
    Custom {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Clockwise90,
    CounterClockwise90,
    Rotate180,
    HorizontalFlip,
    VerticalFlip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataPolicy {
    KeepAll,
    StripAll,
}

/// Cut window for a trim export. Both endpoints are `H:MM:SS.ff` text,
/// handed to the engine verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimWindow {
    pub start: String,
    pub end: String,
    /// Stream-copy instead of re-encoding. Faster, but cuts snap to
    /// keyframes, and any codec/bitrate/quality/sizing options on the
    /// same request are overridden by the copy codecs (the engine
    /// takes the last option given, they are not rejected here).
    pub quick: bool,
}

/// Everything the command builder needs for one export action.
///
/// `output: None` means the user backed out of choosing a destination;
/// the builder treats that as cancellation, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub format: TargetFormat,
    pub resolution: Resolution,
    /// Video bitrate in kbps.
    pub video_bitrate: Option<u32>,
    /// Audio bitrate in kbps.
    pub audio_bitrate: Option<u32>,
    /// CRF quantizer scale; lower means higher quality.
    pub quality: Option<u8>,
    pub rotation: Rotation,
    pub metadata: MetadataPolicy,
    pub trim: Option<TrimWindow>,
    pub output: Option<PathBuf>,
}

impl TranscodeRequest {
    /// A request that keeps everything as-is; callers set only the
    /// knobs they care about.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        TranscodeRequest {
            input: input.into(),
            format: TargetFormat::KeepOriginal,
            resolution: Resolution::Unchanged,
            video_bitrate: None,
            audio_bitrate: None,
            quality: None,
            rotation: Rotation::None,
            metadata: MetadataPolicy::KeepAll,
            trim: None,
            output: None,
        }
    }
}
