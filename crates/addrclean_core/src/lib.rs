//! Addrclean core: pure job controller state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Alert, AlertKind, Effect};
pub use msg::{Msg, RemoteCall};
pub use state::{ControllerState, JobId, JobState, RequestTag};
pub use update::update;
pub use view_model::ControllerViewModel;

/// Status line shown before any job exists.
pub const MSG_UPLOAD_PROMPT: &str = "Upload a file, then press Start.";
/// Status line shown while an upload is in flight.
pub const MSG_UPLOADING: &str = "Uploading...";
/// Validation alert when Upload is triggered without a selected file.
pub const MSG_SELECT_FILE: &str = "Select an xlsx file to upload.";
/// Validation alert when a job action is triggered before any upload.
pub const MSG_UPLOAD_FIRST: &str = "Upload a file first.";
/// One-time notification raised when the job reports completion.
pub const MSG_COMPLETED: &str = "Address cleaning is complete. Download the result.";
