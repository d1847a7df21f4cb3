//! Addrclean engine: job API client, poll timer and the background IO thread.
mod api;
mod disposition;
mod engine;
mod persist;
mod poll;
mod types;

pub use api::{ClientSettings, JobApi, ReqwestJobApi};
pub use disposition::{download_filename, DEFAULT_DOWNLOAD_NAME};
pub use engine::EngineHandle;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::PollTimer;
pub use types::{
    ApiError, DownloadedFile, EngineEvent, JobAction, JobResponse, JobSnapshot, Ticket,
    GENERIC_FAILURE_MESSAGE,
};
