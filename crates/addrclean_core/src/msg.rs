use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked (or cleared) the file for the next upload.
    FileSelected(Option<PathBuf>),
    /// User clicked Upload.
    UploadClicked,
    /// User clicked Start.
    StartClicked,
    /// User clicked Stop.
    StopClicked,
    /// User clicked Download.
    DownloadClicked,
    /// User asked for a status refresh.
    RefreshRequested,
    /// Poll timer fired.
    PollTick,
    /// Resume a job known from the launch context.
    Resume(crate::JobId),
    /// A remote call finished. `Err` carries the user-facing message.
    RemoteCompleted {
        tag: crate::RequestTag,
        call: RemoteCall,
        result: Result<crate::JobState, String>,
    },
    /// A download finished. `Ok` carries where the output was saved.
    DownloadFinished {
        tag: crate::RequestTag,
        result: Result<PathBuf, String>,
    },
    /// The client is going away; tear down polling.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    Upload,
    Start,
    Stop,
    Status,
}
