use std::path::{Path, PathBuf};
use std::time::Duration;

use addrclean_logging::{client_debug, client_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::disposition::download_filename;
use crate::persist::AtomicFileWriter;
use crate::types::Envelope;
use crate::{ApiError, DownloadedFile, JobAction, JobResponse};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Server root, e.g. `http://127.0.0.1:8000`. A path prefix is kept.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_download_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Remote job operations. Every call resolves to the job state the server
/// reported or to the reason it could not be obtained.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<JobResponse, ApiError>;

    async fn job_action(&self, job_id: &str, action: JobAction) -> Result<JobResponse, ApiError>;

    /// Fetches the job output and stores it in `dest_dir`.
    async fn download(&self, job_id: &str, dest_dir: &Path) -> Result<DownloadedFile, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobApi {
    settings: ClientSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestJobApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(settings.base_url.clone()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn upload_url(&self) -> Url {
        self.endpoint(&["api", "upload"])
    }

    /// `{base}/api/jobs/{job_id}/{action}`, with `job_id` percent-encoded.
    pub fn job_url(&self, job_id: &str, action: &str) -> Url {
        self.endpoint(&["api", "jobs", job_id, action])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always editable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobApi {
    async fn upload(&self, path: &Path) -> Result<JobResponse, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ApiError::Io(format!("Could not read {}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.xlsx".to_string());
        client_debug!("Uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(XLSX_MIME)
            .map_err(map_reqwest_error)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let result = read_job_response(response).await?;
        if result.job.job_id.is_empty() {
            return Err(ApiError::MissingJob);
        }
        Ok(result)
    }

    async fn job_action(&self, job_id: &str, action: JobAction) -> Result<JobResponse, ApiError> {
        let url = self.job_url(job_id, action.endpoint());
        let request = match action {
            JobAction::Status => self.client.get(url),
            JobAction::Start | JobAction::Stop => self.client.post(url),
        };
        let response = request.send().await.map_err(map_reqwest_error)?;
        read_job_response(response).await
    }

    async fn download(&self, job_id: &str, dest_dir: &Path) -> Result<DownloadedFile, ApiError> {
        let response = self
            .client
            .get(self.job_url(job_id, "download"))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            // Failures come back as the usual JSON envelope.
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                message: envelope_message(&body),
            });
        }

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                });
            }
        }

        let filename = download_filename(
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
        );

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let byte_len = bytes.len() as u64;
        let path = save_download(dest_dir.to_path_buf(), filename, bytes).await?;
        Ok(DownloadedFile { path, byte_len })
    }
}

/// Writes the body off the async workers; the atomic write fsyncs.
async fn save_download(
    dest_dir: PathBuf,
    filename: String,
    bytes: Vec<u8>,
) -> Result<PathBuf, ApiError> {
    tokio::task::spawn_blocking(move || {
        AtomicFileWriter::new(dest_dir)
            .write(&filename, &bytes)
            .map_err(|err| ApiError::Io(format!("Could not save {filename}: {err}")))
    })
    .await
    .map_err(|err| ApiError::Io(format!("Download write task failed: {err}")))?
}

async fn read_job_response(response: reqwest::Response) -> Result<JobResponse, ApiError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;

    if !status.is_success() {
        let message = envelope_message(&body);
        client_warn!("Server answered {}: {:?}", status, message);
        return Err(ApiError::HttpStatus {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: Envelope = serde_json::from_slice(&body)
        .map_err(|err| ApiError::MalformedResponse(err.to_string()))?;
    if !envelope.ok {
        return Err(ApiError::Rejected {
            message: envelope.message,
        });
    }
    let job = envelope.job.ok_or(ApiError::MissingJob)?;
    Ok(JobResponse {
        job,
        message: envelope.message,
    })
}

fn envelope_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Envelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Transport(err.to_string())
}
