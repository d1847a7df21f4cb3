use std::path::PathBuf;

use crate::view_model::ControllerViewModel;
use crate::MSG_UPLOAD_PROMPT;

/// Opaque server-assigned job identifier.
pub type JobId = String;

/// Job state as reported by the server. Treated as authoritative: the
/// controller renders it verbatim and never derives progress on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    pub job_id: JobId,
    pub percent: u32,
    pub done: u64,
    pub total: u64,
    pub message: String,
    pub source_name: String,
    pub running: bool,
    pub can_start: bool,
    pub can_download: bool,
    pub completed: bool,
    pub stopped: bool,
    pub error: String,
}

/// Identifies the session a request was issued for.
///
/// `epoch` advances every time the current job id changes, so a response
/// only applies while both fields still match the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestTag {
    pub job_id: Option<JobId>,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    job_id: Option<JobId>,
    epoch: u64,
    polling: bool,
    alerted_complete: bool,
    upload_in_flight: bool,
    selected_file: Option<PathBuf>,
    last_job: Option<JobState>,
    file_name: Option<String>,
    status_text: String,
    shut_down: bool,
    dirty: bool,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            job_id: None,
            epoch: 0,
            polling: false,
            alerted_complete: false,
            upload_in_flight: false,
            selected_file: None,
            last_job: None,
            file_name: None,
            status_text: MSG_UPLOAD_PROMPT.to_string(),
            shut_down: false,
            dirty: false,
        }
    }
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ControllerViewModel {
        let (percent, done, total) = self
            .last_job
            .as_ref()
            .map(|job| (job.percent, job.done, job.total))
            .unwrap_or((0, 0, 0));

        ControllerViewModel {
            job_id: self.job_id.clone(),
            progress_value: percent.min(100),
            progress_text: format_progress(percent, done, total),
            status_text: self.status_text.clone(),
            file_name: self.file_name.clone(),
            selected_file: self.selected_file.clone(),
            upload_enabled: !self.upload_in_flight && !self.shut_down,
            start_enabled: self.start_allowed(),
            stop_enabled: self.stop_allowed(),
            download_enabled: self.download_allowed(),
            polling: self.polling,
            dirty: self.dirty,
        }
    }

    /// Start, Stop and Download follow the flags of the latest snapshot;
    /// with no snapshot yet all three are off.
    pub(crate) fn start_allowed(&self) -> bool {
        self.last_job.as_ref().is_some_and(|job| job.can_start)
    }

    pub(crate) fn stop_allowed(&self) -> bool {
        self.last_job.as_ref().is_some_and(|job| job.running)
    }

    pub(crate) fn download_allowed(&self) -> bool {
        self.last_job.as_ref().is_some_and(|job| job.can_download)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Tag for a request issued against the current session.
    pub fn request_tag(&self) -> RequestTag {
        RequestTag {
            job_id: self.job_id.clone(),
            epoch: self.epoch,
        }
    }

    /// Whether a response tagged with `tag` still belongs to this session.
    pub fn accepts(&self, tag: &RequestTag) -> bool {
        tag.epoch == self.epoch && tag.job_id == self.job_id
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn selected_file(&self) -> Option<&PathBuf> {
        self.selected_file.as_ref()
    }

    pub(crate) fn set_selected_file(&mut self, path: Option<PathBuf>) {
        if self.selected_file != path {
            self.selected_file = path;
            self.mark_dirty();
        }
    }

    pub(crate) fn upload_in_flight(&self) -> bool {
        self.upload_in_flight
    }

    pub(crate) fn set_upload_in_flight(&mut self, in_flight: bool) {
        if self.upload_in_flight != in_flight {
            self.upload_in_flight = in_flight;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_status(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.status_text != text {
            self.status_text = text;
            self.mark_dirty();
        }
    }

    /// Switches to `job_id`, opening a new epoch so that responses issued
    /// for the previous job are no longer accepted.
    pub(crate) fn switch_job(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
        self.epoch += 1;
        self.last_job = None;
        self.alerted_complete = false;
        self.mark_dirty();
    }

    /// Returns true when the timer has to be started.
    pub(crate) fn ensure_polling(&mut self) -> bool {
        if self.polling {
            return false;
        }
        self.polling = true;
        true
    }

    /// Returns true when a running timer has to be stopped.
    pub(crate) fn cease_polling(&mut self) -> bool {
        std::mem::replace(&mut self.polling, false)
    }

    pub(crate) fn shut_down(&mut self) {
        self.shut_down = true;
        self.mark_dirty();
    }

    /// Renders `job` into the controller. Returns true exactly once per
    /// completion event, when the caller has to raise the completion alert.
    pub(crate) fn apply_job_state(&mut self, job: JobState) -> bool {
        self.set_status(job.message.clone());
        if !job.source_name.is_empty() && self.file_name.as_deref() != Some(&job.source_name) {
            self.file_name = Some(job.source_name.clone());
            self.mark_dirty();
        }

        let notify = job.completed && !self.alerted_complete;
        if notify {
            self.alerted_complete = true;
        }

        if self.last_job.as_ref() != Some(&job) {
            self.last_job = Some(job);
            self.mark_dirty();
        }
        notify
    }
}

fn format_progress(percent: u32, done: u64, total: u64) -> String {
    format!("{percent}% ({done}/{total})")
}
