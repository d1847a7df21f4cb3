use std::fs;
use std::time::Duration;

use addrclean_engine::{
    ApiError, ClientSettings, JobAction, JobApi, JobSnapshot, ReqwestJobApi,
    GENERIC_FAILURE_MESSAGE,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> ReqwestJobApi {
    ReqwestJobApi::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("valid base url")
}

fn job_json(job_id: &str) -> serde_json::Value {
    json!({
        "job_id": job_id,
        "source_name": "addresses.xlsx",
        "done": 21,
        "total": 50,
        "percent": 42,
        "running": true,
        "completed": false,
        "stopped": false,
        "error": "",
        "message": "Cleaning in progress... 21/50",
        "can_download": true,
        "can_start": false
    })
}

#[tokio::test]
async fn upload_sends_multipart_file_and_returns_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"addresses.xlsx\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "message": "Upload complete. 50 rows to clean",
            "job": job_json("J1"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("addresses.xlsx");
    fs::write(&file, "PK fake workbook").unwrap();

    let response = api_for(&server).upload(&file).await.expect("upload ok");
    assert_eq!(
        response.message.as_deref(),
        Some("Upload complete. 50 rows to clean")
    );
    assert_eq!(
        response.job,
        JobSnapshot {
            job_id: "J1".to_string(),
            source_name: "addresses.xlsx".to_string(),
            done: 21,
            total: 50,
            percent: 42,
            running: true,
            completed: false,
            stopped: false,
            error: String::new(),
            message: "Cleaning in progress... 21/50".to_string(),
            can_download: true,
            can_start: false,
        }
    );
}

#[tokio::test]
async fn upload_of_missing_file_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let err = api_for(&server)
        .upload(&temp.path().join("missing.xlsx"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Io(_)));
    assert!(err.user_message().contains("missing.xlsx"));
}

#[tokio::test]
async fn status_targets_job_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "job": job_json("J1"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = api_for(&server)
        .job_action("J1", JobAction::Status)
        .await
        .expect("status ok");
    assert_eq!(response.job.job_id, "J1");
    assert_eq!(response.job.percent, 42);
    assert_eq!(response.message, None);
}

#[tokio::test]
async fn start_and_stop_use_post() {
    let server = MockServer::start().await;
    for action in ["start", "stop"] {
        Mock::given(method("POST"))
            .and(path(format!("/api/jobs/J1/{action}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "message": format!("{action} accepted"),
                "job": job_json("J1"),
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let api = api_for(&server);
    let started = api.job_action("J1", JobAction::Start).await.unwrap();
    assert_eq!(started.message.as_deref(), Some("start accepted"));
    let stopped = api.job_action("J1", JobAction::Stop).await.unwrap();
    assert_eq!(stopped.message.as_deref(), Some("stop accepted"));
}

#[tokio::test]
async fn missing_fields_fall_back_to_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "job": { "job_id": "J1", "percent": 10, "extra": "ignored" },
        })))
        .mount(&server)
        .await;

    let response = api_for(&server)
        .job_action("J1", JobAction::Status)
        .await
        .unwrap();
    assert_eq!(
        response.job,
        JobSnapshot {
            job_id: "J1".to_string(),
            percent: 10,
            ..JobSnapshot::default()
        }
    );
}

#[tokio::test]
async fn job_id_is_percent_encoded_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/a%2Fb/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "job": job_json("a/b"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    assert!(api.job_url("a/b", "status").path().ends_with("/jobs/a%2Fb/status"));
    api.job_action("a/b", JobAction::Status).await.unwrap();
}

#[test]
fn base_path_prefix_is_kept() {
    let api = ReqwestJobApi::new(ClientSettings {
        base_url: "http://example.com/cleaner/".to_string(),
        ..ClientSettings::default()
    })
    .unwrap();
    assert_eq!(
        api.job_url("J1", "start").as_str(),
        "http://example.com/cleaner/api/jobs/J1/start"
    );
    assert_eq!(
        api.upload_url().as_str(),
        "http://example.com/cleaner/api/upload"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ReqwestJobApi::new(ClientSettings {
        base_url: "not a url".to_string(),
        ..ClientSettings::default()
    })
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl(_)));
}

#[tokio::test]
async fn not_ok_envelope_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/J1/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "message": "Job is in an error state",
        })))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .job_action("J1", JobAction::Start)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Rejected {
            message: Some("Job is in an error state".to_string())
        }
    );
    assert_eq!(err.user_message(), "Job is in an error state");
}

#[tokio::test]
async fn http_error_keeps_envelope_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/nope/status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ok": false,
            "message": "Job not found.",
        })))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .job_action("nope", JobAction::Status)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::HttpStatus {
            status: 404,
            message: Some("Job not found.".to_string())
        }
    );
    assert_eq!(err.user_message(), "Job not found.");
}

#[tokio::test]
async fn non_json_error_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .job_action("J1", JobAction::Status)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::HttpStatus {
            status: 502,
            message: None
        }
    );
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn ok_envelope_without_job_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .job_action("J1", JobAction::Status)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::MissingJob);
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .job_action("J1", JobAction::Status)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse(_)));
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({ "ok": true, "job": job_json("J1") })),
        )
        .mount(&server)
        .await;

    let api = ReqwestJobApi::new(ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    })
    .unwrap();
    let err = api.job_action("J1", JobAction::Status).await.unwrap_err();
    assert_eq!(err, ApiError::Timeout);
}

#[tokio::test]
async fn download_saves_body_under_server_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    "attachment; filename=output_partial.xlsx",
                )
                .set_body_raw(
                    b"PK workbook bytes".to_vec(),
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("downloads");
    let file = api_for(&server).download("J1", &dest).await.unwrap();

    assert_eq!(file.path, dest.join("output_partial.xlsx"));
    assert_eq!(file.byte_len, 17);
    assert_eq!(fs::read(&file.path).unwrap(), b"PK workbook bytes");
}

#[tokio::test]
async fn download_without_output_reports_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/download"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "message": "No converted output to download.",
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let err = api_for(&server)
        .download("J1", temp.path())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "No converted output to download.");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn download_rejects_oversized_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 11], "application/octet-stream"))
        .mount(&server)
        .await;

    let api = ReqwestJobApi::new(ClientSettings {
        base_url: server.uri(),
        max_download_bytes: 10,
        ..ClientSettings::default()
    })
    .unwrap();
    let temp = TempDir::new().unwrap();
    let err = api.download("J1", temp.path()).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn download_into_unusable_directory_reports_io_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PK".to_vec(), "application/octet-stream"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("downloads");
    fs::write(&not_a_dir, b"occupied").unwrap();

    let err = api_for(&server).download("J1", &not_a_dir).await.unwrap_err();
    assert!(matches!(err, ApiError::Io(ref message) if message.contains("output.xlsx")));
    assert_eq!(fs::read(&not_a_dir).unwrap(), b"occupied");
}

#[tokio::test(flavor = "current_thread")]
async fn download_completes_on_single_threaded_runtime() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"PK".to_vec(), "application/octet-stream"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/J1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "job": job_json("J1"),
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let api = api_for(&server);
    let (download, status) = tokio::join!(
        api.download("J1", temp.path()),
        api.job_action("J1", JobAction::Status)
    );
    assert_eq!(download.unwrap().path, temp.path().join("output.xlsx"));
    assert_eq!(status.unwrap().job.job_id, "J1");
}
