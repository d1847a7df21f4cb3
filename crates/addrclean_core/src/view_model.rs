use std::path::PathBuf;

use crate::JobId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerViewModel {
    pub job_id: Option<JobId>,
    /// Progress bar position, 0..=100.
    pub progress_value: u32,
    /// `"{percent}% ({done}/{total})"`.
    pub progress_text: String,
    pub status_text: String,
    /// Source file name reported by the server.
    pub file_name: Option<String>,
    /// File chosen locally for the next upload.
    pub selected_file: Option<PathBuf>,
    pub upload_enabled: bool,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub download_enabled: bool,
    pub polling: bool,
    pub dirty: bool,
}
