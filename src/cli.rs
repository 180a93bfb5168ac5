use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::command::{self, CommandLine};
use crate::core::error::ExportError;
use crate::core::job::Job;
use crate::core::preset;
use crate::core::probe;
use crate::core::progress::ProgressUpdate;
use crate::core::request::{
    MetadataPolicy, Resolution, Rotation, TargetFormat, TranscodeRequest, TrimWindow,
};
use crate::core::runner;
use crate::core::timecode::{format_timestamp, parse_timestamp};

#[derive(Debug, Parser)]
#[command(name = "ffexport", version, about = "Media export tool driving ffmpeg")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transcode a media file
    Export(ExportArgs),
    /// Cut a time range out of a media file
    Trim(TrimArgs),
    /// Show duration, resolution and aspect ratio of a media file
    Probe(ProbeArgs),
    /// Run a stored command template
    Preset(PresetArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RotateChoice {
    None,
    Cw90,
    Ccw90,
    R180,
    Hflip,
    Vflip,
}

impl From<RotateChoice> for Rotation {
    fn from(choice: RotateChoice) -> Self {
        match choice {
            RotateChoice::None => Rotation::None,
            RotateChoice::Cw90 => Rotation::Clockwise90,
            RotateChoice::Ccw90 => Rotation::CounterClockwise90,
            RotateChoice::R180 => Rotation::Rotate180,
            RotateChoice::Hflip => Rotation::HorizontalFlip,
            RotateChoice::Vflip => Rotation::VerticalFlip,
        }
    }
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination file; omitting it cancels the export
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Target format: a container name, "mp4 (h264)", "mp4 (h265)",
    /// or "keep" for the input's own format
    #[arg(short = 'f', long = "format", default_value = "keep")]
    pub format: String,
    /// Frame size as WIDTHxHEIGHT
    #[arg(short = 's', long = "size")]
    pub size: Option<String>,
    /// Width of a custom frame size; height derives from the input's
    /// aspect ratio unless --height is also given
    #[arg(long = "width", conflicts_with = "size")]
    pub width: Option<u32>,
    #[arg(long = "height", conflicts_with = "size")]
    pub height: Option<u32>,
    /// Video bitrate in kbps
    #[arg(long = "vb")]
    pub video_bitrate: Option<u32>,
    /// Audio bitrate in kbps
    #[arg(long = "ab")]
    pub audio_bitrate: Option<u32>,
    /// CRF quality, 0-51, lower is better
    #[arg(short = 'q', long = "quality")]
    pub quality: Option<u8>,
    #[arg(long = "rotate", value_enum, default_value_t = RotateChoice::None)]
    pub rotate: RotateChoice,
    /// Drop all metadata instead of carrying it over
    #[arg(long = "strip-metadata")]
    pub strip_metadata: bool,
}

#[derive(Debug, Args)]
pub struct TrimArgs {
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Cut start, H:MM:SS.ff
    #[arg(long = "start", default_value = "00:00:00.00")]
    pub start: String,
    /// Cut end, H:MM:SS.ff; defaults to the end of the input
    #[arg(long = "end")]
    pub end: Option<String>,
    /// Stream-copy instead of re-encoding; faster, but cuts snap to
    /// keyframes
    #[arg(long = "quick")]
    pub quick: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct PresetArgs {
    /// Preset file, one command template per line
    #[arg(short = 'p', long = "presets")]
    pub file: PathBuf,
    /// Which template to run, first is 1
    #[arg(short = 'n', long = "number", default_value_t = 1)]
    pub number: usize,
    /// Input files, one per template slot in slot order
    #[arg(short = 'i', long = "input")]
    pub inputs: Vec<String>,
    #[arg(short = 'o', long = "output")]
    pub output: String,
}

pub fn export_args_to_request(args: &ExportArgs) -> Result<TranscodeRequest, ExportError> {
    let mut request = TranscodeRequest::new(args.input.clone());
    request.output = args.output.clone();

    request.format = if args.format == "keep" {
        TargetFormat::KeepOriginal
    } else {
        TargetFormat::Named(args.format.clone())
    };

    request.resolution = match (&args.size, args.width, args.height) {
        (Some(size), _, _) => Resolution::Preset(size.clone()),
        (None, Some(width), Some(height)) => Resolution::Custom { width, height },
        (None, Some(width), None) => {
            let ratio = probe::media_aspect_ratio(&args.input)?;
            let height = ratio.and_then(|r| r.derive_height(width)).ok_or_else(|| {
                ExportError::InvalidRequest {
                    message: "cannot derive height: input aspect ratio unknown".to_string(),
                }
            })?;
            Resolution::Custom { width, height }
        }
        (None, None, Some(height)) => {
            let ratio = probe::media_aspect_ratio(&args.input)?;
            let width = ratio.and_then(|r| r.derive_width(height)).ok_or_else(|| {
                ExportError::InvalidRequest {
                    message: "cannot derive width: input aspect ratio unknown".to_string(),
                }
            })?;
            Resolution::Custom { width, height }
        }
        (None, None, None) => Resolution::Unchanged,
    };

    request.video_bitrate = args.video_bitrate;
    request.audio_bitrate = args.audio_bitrate;
    request.quality = args.quality;
    request.rotation = args.rotate.into();
    request.metadata = if args.strip_metadata {
        MetadataPolicy::StripAll
    } else {
        MetadataPolicy::KeepAll
    };

    Ok(request)
}

pub fn execute(command: Commands) -> Result<(), ExportError> {
    match command {
        Commands::Export(args) => {
            let request = export_args_to_request(&args)?;
            match command::build(&request) {
                Some(cmd) => run_and_render(cmd, None),
                None => {
                    println!(
                        "no output path given; nothing to do (target format: {})",
                        command::output_extension(&request)
                    );
                    Ok(())
                }
            }
        }
        Commands::Trim(args) => {
            let end = match args.end {
                Some(end) => end,
                None => {
                    let total = probe::media_duration(&args.input)?.ok_or_else(|| {
                        ExportError::InvalidRequest {
                            message: "input duration unknown; pass --end".to_string(),
                        }
                    })?;
                    format_timestamp(total)
                }
            };

            // The engine reports the source's full duration, not the
            // trimmed span, so the span is worked out up front.
            let span = parse_timestamp(&end)? - parse_timestamp(&args.start)?;

            let mut request = TranscodeRequest::new(args.input);
            request.output = args.output;
            request.trim = Some(TrimWindow {
                start: args.start,
                end,
                quick: args.quick,
            });

            match command::build(&request) {
                Some(cmd) => run_and_render(cmd, Some(span.max(0.0))),
                None => {
                    println!("no output path given; nothing to do");
                    Ok(())
                }
            }
        }
        Commands::Probe(args) => {
            println!("engine     : {}", probe::engine_version()?);
            match probe::media_duration(&args.input)? {
                Some(total) => println!("duration   : {}", format_timestamp(total)),
                None => println!("duration   : unknown"),
            }
            match probe::media_resolution(&args.input)? {
                Some((width, height)) => {
                    let ratio = probe::AspectRatio::classify(width, height);
                    println!("resolution : {width}x{height} ({ratio})");
                    let suggested = ratio.suggested_resolutions();
                    if !suggested.is_empty() {
                        println!("suggested  : {}", suggested.join(", "));
                    }
                }
                None => println!("resolution : unknown"),
            }
            Ok(())
        }
        Commands::Preset(args) => {
            let templates = preset::load_presets(&args.file)?;
            let template =
                templates
                    .get(args.number.wrapping_sub(1))
                    .ok_or_else(|| ExportError::InvalidTemplate {
                        message: format!(
                            "preset {} of {} requested",
                            args.number,
                            templates.len()
                        ),
                    })?;
            let tokens = template.substitute(&args.inputs, &args.output)?;
            run_and_render(CommandLine::from(tokens), None)
        }
    }
}

/// Run the job on a worker thread and drain progress on this one; the
/// runner blocks, so the two must not share a thread.
fn run_and_render(cmd: CommandLine, total_hint: Option<f64>) -> Result<(), ExportError> {
    let (tx, rx) = mpsc::channel::<ProgressUpdate>();

    let worker = thread::spawn(move || runner::run(&cmd, tx, total_hint));

    for update in rx {
        render_progress(&update);
    }
    println!();

    let job = worker
        .join()
        .map_err(|_| ExportError::StreamRead {
            message: "worker thread panicked".to_string(),
        })??;

    report(&job);
    Ok(())
}

fn render_progress(update: &ProgressUpdate) {
    let current = format_timestamp(update.current_seconds);
    match (update.total_seconds, update.percentage) {
        (Some(total), Some(pct)) => {
            print!("\rprogress: {current} / {} ({pct:.1}%)", format_timestamp(total));
        }
        _ => {
            print!("\rprogress: {current} / --:--:--.--");
        }
    }
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

fn report(job: &Job) {
    if job.succeeded() {
        println!("done (exit code 0)");
    } else {
        match job.exit_code {
            Some(code) => println!("engine failed (exit code {code})"),
            None => println!("engine terminated by signal"),
        }
        // Last diagnostic lines usually name the cause; pass them on
        // verbatim.
        for line in job.log.lines().rev().take(5).collect::<Vec<_>>().iter().rev() {
            eprintln!("  {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_args_map_to_request() {
        let args = ExportArgs {
            input: "clip.mkv".into(),
            output: Some("out.mp4".into()),
            format: "mp4 (h264)".to_string(),
            size: Some("1280x720".to_string()),
            width: None,
            height: None,
            video_bitrate: Some(2500),
            audio_bitrate: None,
            quality: Some(28),
            rotate: RotateChoice::Cw90,
            strip_metadata: true,
        };
        let request = export_args_to_request(&args).unwrap();
        assert_eq!(request.format, TargetFormat::Named("mp4 (h264)".into()));
        assert_eq!(request.resolution, Resolution::Preset("1280x720".into()));
        assert_eq!(request.rotation, Rotation::Clockwise90);
        assert_eq!(request.metadata, MetadataPolicy::StripAll);
        assert_eq!(request.video_bitrate, Some(2500));
    }

    #[test]
    fn keep_format_maps_to_keep_original() {
        let args = ExportArgs {
            input: "clip.mkv".into(),
            output: None,
            format: "keep".to_string(),
            size: None,
            width: None,
            height: None,
            video_bitrate: None,
            audio_bitrate: None,
            quality: None,
            rotate: RotateChoice::None,
            strip_metadata: false,
        };
        let request = export_args_to_request(&args).unwrap();
        assert_eq!(request.format, TargetFormat::KeepOriginal);
        assert_eq!(request.resolution, Resolution::Unchanged);
        assert!(request.output.is_none());
    }
}
