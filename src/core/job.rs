use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

/// Terminal record of one engine run.
///
/// A non-zero exit is not an error at this level: the job completes
/// with `Failed` status and the code is preserved for the caller to
/// surface. `exit_code` is `None` when the process was killed by a
/// signal.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub status: JobStatus,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub exit_code: Option<i32>,
    /// Diagnostic text captured from the engine, kept so failures can
    /// be reported verbatim.
    pub log: String,
}

impl Job {
    pub fn new(id: u64) -> Self {
        Job {
            id,
            status: JobStatus::Pending,
            started_at: None,
            ended_at: None,
            exit_code: None,
            log: String::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Finished
    }
}
