use std::path::PathBuf;

use crate::{JobId, RequestTag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the file to the upload endpoint.
    Upload { tag: RequestTag, path: PathBuf },
    /// Issue a start, stop or status request for `job_id`.
    Call {
        tag: RequestTag,
        job_id: JobId,
        call: crate::RemoteCall,
    },
    /// Fetch the job output as a binary resource.
    Download { tag: RequestTag, job_id: JobId },
    StartPolling,
    StopPolling,
    /// Remember the current job so a later run can resume it.
    PersistJobId(JobId),
    /// Blocking user-facing notification.
    Alert(Alert),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Client-side precondition failed (missing file or job id).
    Validation,
    /// Server-reported failure or transport error.
    Remote,
    /// The job finished.
    Completed,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
