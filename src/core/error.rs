use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("ffmpeg binary not found in PATH")]
    BinaryNotFound,
    #[error("failed to launch engine: {message}")]
    SpawnFailed { message: String },
    #[error("malformed timestamp: {text}")]
    BadTimestamp { text: String },
    #[error("failed to read engine output: {message}")]
    StreamRead { message: String },
    #[error("invalid preset template: {message}")]
    InvalidTemplate { message: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::StreamRead {
            message: err.to_string(),
        }
    }
}
