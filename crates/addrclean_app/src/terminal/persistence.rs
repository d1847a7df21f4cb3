use std::fs;
use std::path::{Path, PathBuf};

use addrclean_engine::AtomicFileWriter;
use addrclean_logging::{client_error, client_info, client_warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSession {
    last_job_id: Option<String>,
}

/// Job id remembered by a previous run, if any.
pub(crate) fn load_last_job_id(path: &Path) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return None;
        }
        Err(err) => {
            client_warn!("Failed to read session from {:?}: {}", path, err);
            return None;
        }
    };

    let session: PersistedSession = match ron::from_str(&content) {
        Ok(session) => session,
        Err(err) => {
            client_warn!("Failed to parse session from {:?}: {}", path, err);
            return None;
        }
    };

    let job_id = session.last_job_id.filter(|id| !id.is_empty());
    if let Some(job_id) = &job_id {
        client_info!("Loaded last job id {} from {:?}", job_id, path);
    }
    job_id
}

pub(crate) fn save_last_job_id(path: &Path, job_id: &str) {
    let session = PersistedSession {
        last_job_id: Some(job_id.to_string()),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&session, pretty) {
        Ok(text) => text,
        Err(err) => {
            client_error!("Failed to serialize session: {}", err);
            return;
        }
    };

    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        client_error!("Session path {:?} has no file name", path);
        return;
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let writer = AtomicFileWriter::new(dir);
    if let Err(err) = writer.write(filename, content.as_bytes()) {
        client_error!("Failed to write session to {:?}: {}", path, err);
    }
}
