use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-chosen identifier echoed back on the matching [`EngineEvent`].
pub type Ticket = u64;

/// Message surfaced when a failure carries no server-provided text.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while processing the request.";

/// Job state as serialized by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSnapshot {
    pub job_id: String,
    pub source_name: String,
    pub done: u64,
    pub total: u64,
    pub percent: u32,
    pub running: bool,
    pub completed: bool,
    pub stopped: bool,
    pub error: String,
    pub message: String,
    pub can_download: bool,
    pub can_start: bool,
}

/// `{ok, message?, job?}` wrapper around every JSON response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Envelope {
    pub ok: bool,
    pub message: Option<String>,
    pub job: Option<JobSnapshot>,
}

/// Successful job endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResponse {
    pub job: JobSnapshot,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub byte_len: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    Start,
    Stop,
    Status,
}

impl JobAction {
    /// Last path segment of the endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            JobAction::Start => "start",
            JobAction::Stop => "stop",
            JobAction::Status => "status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Upload, start, stop or status finished.
    JobResponse {
        ticket: Ticket,
        result: Result<JobResponse, ApiError>,
    },
    DownloadFinished {
        ticket: Ticket,
        result: Result<DownloadedFile, ApiError>,
    },
    /// The poll timer fired.
    PollTick,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("http status {status}")]
    HttpStatus { status: u16, message: Option<String> },
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("response carried no job state")]
    MissingJob,
    #[error("io error: {0}")]
    Io(String),
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl ApiError {
    /// Text shown to the user: the server's message when it sent one,
    /// local file problems verbatim, everything else the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::HttpStatus {
                message: Some(message),
                ..
            }
            | ApiError::Rejected {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            ApiError::Io(message) => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
