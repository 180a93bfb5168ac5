use crate::core::request::{
    MetadataPolicy, Resolution, Rotation, TargetFormat, TranscodeRequest,
};

/// Ordered argument list for one engine invocation, excluding the
/// program name itself. Tokens are only ever appended while building;
/// once handed out the list is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    args: Vec<String>,
}

impl CommandLine {
    fn new() -> Self {
        CommandLine { args: Vec::new() }
    }

    fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(args: Vec<String>) -> Self {
        CommandLine { args }
    }
}

/// Map a format choice to (container extension, pinned codec).
fn resolve_format<'a>(format: &'a TargetFormat, input_ext: &'a str) -> (&'a str, Option<&'a str>) {
    match format {
        TargetFormat::KeepOriginal => (input_ext, None),
        TargetFormat::Named(name) => match name.as_str() {
            "mp4 (h264)" => ("mp4", Some("libx264")),
            "mp4 (h265)" => ("mp4", Some("libx265")),
            other => (other, None),
        },
    }
}

/// Build the engine argument list for a request.
///
/// Returns `None` when the request carries no output path (the user
/// cancelled the save dialog). Token order follows the engine's
/// parsing rules: `-y` and the input first, per-stream options next,
/// output path always last.
pub fn build(request: &TranscodeRequest) -> Option<CommandLine> {
    let output = request.output.as_ref()?;

    let input_ext = request
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    let (_, codec) = resolve_format(&request.format, input_ext);

    let mut cmd = CommandLine::new();
    cmd.push("-y");
    cmd.push("-i");
    cmd.push(request.input.to_string_lossy());

    match request.metadata {
        MetadataPolicy::KeepAll => {
            cmd.push("-map_metadata");
            cmd.push("0");
            // mov stores tags outside the default atom; without this
            // flag the engine drops them even with -map_metadata 0.
            if input_ext.eq_ignore_ascii_case("mov") {
                cmd.push("-movflags");
                cmd.push("use_metadata_tags");
            }
        }
        MetadataPolicy::StripAll => {
            cmd.push("-map_metadata");
            cmd.push("-1");
        }
    }

    if let Some(codec) = codec {
        cmd.push("-c:v");
        cmd.push(codec);
    }

    match &request.resolution {
        Resolution::Unchanged => {}
        Resolution::Preset(size) => {
            cmd.push("-s");
            cmd.push(size.clone());
        }
        Resolution::Custom { width, height } => {
            cmd.push("-s");
            cmd.push(format!("{width}x{height}"));
        }
    }

    if let Some(kbps) = request.video_bitrate {
        cmd.push("-b:v");
        cmd.push(format!("{kbps}k"));
    }

    if let Some(kbps) = request.audio_bitrate {
        cmd.push("-b:a");
        cmd.push(format!("{kbps}k"));
    }

    if let Some(crf) = request.quality {
        cmd.push("-crf");
        cmd.push(crf.to_string());
    }

    let filter = match request.rotation {
        Rotation::None => None,
        Rotation::Clockwise90 => Some("transpose=1"),
        Rotation::CounterClockwise90 => Some("transpose=2"),
        Rotation::Rotate180 => Some("transpose=2,transpose=2"),
        Rotation::HorizontalFlip => Some("hflip"),
        Rotation::VerticalFlip => Some("vflip"),
    };
    if let Some(filter) = filter {
        cmd.push("-vf");
        cmd.push(filter);
    }

    if let Some(trim) = &request.trim {
        cmd.push("-ss");
        cmd.push(trim.start.clone());
        cmd.push("-to");
        cmd.push(trim.end.clone());
        if trim.quick {
            cmd.push("-c:v");
            cmd.push("copy");
            cmd.push("-c:a");
            cmd.push("copy");
        }
    }

    cmd.push(output.to_string_lossy());

    Some(cmd)
}

/// The output extension implied by a request, for callers that suggest
/// a destination file name.
pub fn output_extension(request: &TranscodeRequest) -> String {
    let input_ext = request
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    resolve_format(&request.format, input_ext).0.to_string()
}
