use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crate::core::command::CommandLine;
use crate::core::error::ExportError;
use crate::core::job::{Job, JobStatus};
use crate::core::progress::{ProgressTracker, ProgressUpdate};

pub const ENGINE: &str = "ffmpeg";

/// Run a built command against the default engine binary.
///
/// Blocking: call it on a worker thread, never on the thread that
/// renders progress. Updates arrive on `progress_tx` in diagnostic
/// line order; the unbounded channel means sending never stalls the
/// stream reader. `total_hint` pre-seeds the tracker when the caller
/// already knows the duration (a trim knows the span it writes).
pub fn run(
    command: &CommandLine,
    progress_tx: Sender<ProgressUpdate>,
    total_hint: Option<f64>,
) -> Result<Job, ExportError> {
    run_with_engine(ENGINE, command.args(), progress_tx, total_hint)
}

pub fn run_with_engine(
    engine: &str,
    args: &[String],
    progress_tx: Sender<ProgressUpdate>,
    total_hint: Option<f64>,
) -> Result<Job, ExportError> {
    let mut job = Job::new(1);

    log::debug!("executing command: {} {}", engine, args.join(" "));

    job.status = JobStatus::Running;
    job.started_at = Some(Instant::now());

    let mut cmd = Command::new(engine);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExportError::BinaryNotFound
        } else {
            ExportError::SpawnFailed {
                message: e.to_string(),
            }
        }
    })?;

    let stderr = child.stderr.take().ok_or_else(|| ExportError::StreamRead {
        message: "failed to capture engine stderr".to_string(),
    })?;

    let log_buffer = Arc::new(Mutex::new(String::new()));
    let log_buffer_reader = Arc::clone(&log_buffer);

    let mut tracker = match total_hint {
        Some(total) => ProgressTracker::with_total(total),
        None => ProgressTracker::new(),
    };

    let reader_handle = thread::spawn(move || -> Result<(), std::io::Error> {
        let mut reader = BufReader::new(stderr);
        let mut line_buf: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];

        let mut handle_line = |line_buf: &mut Vec<u8>| {
            let line = String::from_utf8_lossy(line_buf)
                .trim_matches(&['\r', '\n'][..])
                .to_string();
            line_buf.clear();

            if line.is_empty() {
                return;
            }

            if let Some(update) = tracker.feed(&line) {
                let _ = progress_tx.send(update);
            }

            if let Ok(mut buffer) = log_buffer_reader.lock() {
                buffer.push_str(&line);
                buffer.push('\n');
            }
        };

        loop {
            // The engine redraws its status line with a bare carriage
            // return, so split on both delimiters instead of read_line.
            match reader.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            match byte[0] {
                b'\r' | b'\n' => {
                    if !line_buf.is_empty() {
                        handle_line(&mut line_buf);
                    }
                }
                other => {
                    line_buf.push(other);
                }
            }
        }

        if !line_buf.is_empty() {
            handle_line(&mut line_buf);
        }

        Ok(())
    });

    let status = child.wait().map_err(|e| ExportError::StreamRead {
        message: e.to_string(),
    })?;

    match reader_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(ExportError::StreamRead {
                message: e.to_string(),
            })
        }
        Err(_) => {
            return Err(ExportError::StreamRead {
                message: "diagnostic reader thread panicked".to_string(),
            })
        }
    }

    job.ended_at = Some(Instant::now());
    job.exit_code = status.code();
    job.status = if status.success() {
        JobStatus::Finished
    } else {
        JobStatus::Failed
    };
    job.log = log_buffer
        .lock()
        .map(|buffer| buffer.clone())
        .unwrap_or_default();

    if let (Some(started), Some(ended)) = (job.started_at, job.ended_at) {
        log::debug!(
            "job {} exited with {:?} after {:.1}s",
            job.id,
            job.exit_code,
            (ended - started).as_secs_f64()
        );
    }

    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn missing_binary_is_an_error_result() {
        let (tx, _rx) = mpsc::channel();
        let args = vec!["-version".to_string()];
        let result = run_with_engine("ffexport-no-such-engine", &args, tx, None);
        assert!(matches!(result, Err(ExportError::BinaryNotFound)));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[test]
    fn events_follow_diagnostic_line_order() {
        let (tx, rx) = mpsc::channel();
        let script = "printf 'Duration: 00:01:40.00, start: 0.0\\n' >&2; \
                      printf 'time=00:00:25.00 bitrate=1k\\r' >&2; \
                      printf 'time=00:00:50.00 bitrate=1k\\n' >&2";
        let job = run_with_engine("/bin/sh", &sh(script), tx, None).unwrap();

        assert!(job.succeeded());
        assert_eq!(job.exit_code, Some(0));

        let updates: Vec<_> = rx.iter().collect();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].percentage, Some(0.0));
        assert_eq!(updates[1].percentage, Some(25.0));
        assert_eq!(updates[2].percentage, Some(50.0));
    }

    #[cfg(unix)]
    #[test]
    fn total_hint_overrides_reported_duration() {
        let (tx, rx) = mpsc::channel();
        let script = "printf 'Duration: 00:10:00.00\\n' >&2; \
                      printf 'time=00:00:05.00\\n' >&2";
        run_with_engine("/bin/sh", &sh(script), tx, Some(10.0)).unwrap();

        let updates: Vec<_> = rx.iter().collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].percentage, Some(50.0));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_data_not_error() {
        let (tx, _rx) = mpsc::channel();
        let script = "printf 'clip.mkv: No such file or directory\\n' >&2; exit 1";
        let job = run_with_engine("/bin/sh", &sh(script), tx, None).unwrap();

        assert!(!job.succeeded());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.exit_code, Some(1));
        assert!(job.log.contains("No such file or directory"));
    }
}
