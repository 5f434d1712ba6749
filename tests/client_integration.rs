//! Integration tests for the prediction client.
//!
//! These tests drive the real reqwest transport against wiremock servers.

mod support;

use std::time::Duration;

use ilabs_api::{Client, ClientConfig, ClientError, PollPolicy, PredictParams};
use support::{
    SequenceResponder, TEST_USER_KEY, client_for, completed_status, pending_status, requests_to,
};
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUS_PATH: &str = "/v1/reference/reference/task-1/status";
const CANCEL_PATH: &str = "/v1/reference/reference/task-1/cancel";

/// Mounts upload and submit endpoints that hand out `in-1` / `task-1`.
async fn mount_upload_and_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/documents/input"))
        .and(header("user-key", TEST_USER_KEY))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({"input_filename": "in-1"})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/reference/reference/in-1"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(serde_json::json!({"task_id": "task-1"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_full_pipeline_returns_processed_content() {
    let server = MockServer::start().await;
    mount_upload_and_submit(&server).await;

    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(SequenceResponder::new(vec![
            pending_status(),
            pending_status(),
            completed_status(None),
        ]))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/documents/output/in-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<references/>".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, sleeper) = client_for(&server);
    let output = client
        .run("reference", &b"Smith, J. (2001)"[..], None)
        .await
        .expect("pipeline should succeed");

    assert_eq!(&output[..], b"<references/>");
    assert_eq!(
        sleeper.recorded(),
        [
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    assert_eq!(requests_to(&server, CANCEL_PATH).await, 0);

    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(order.first().map(String::as_str), Some("/v1/documents/input"));
    assert_eq!(order.last().map(String::as_str), Some("/v1/documents/output/in-1"));
}

#[tokio::test]
async fn test_upload_sends_raw_body_and_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/documents/input"))
        .and(header("user-key", TEST_USER_KEY))
        .and(header("user-agent", "@innodatalabs/ilabs-api"))
        .and(header("cache-control", "no-cache"))
        .and(body_bytes(b"raw document".to_vec()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"input_filename": "abc.txt"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let name = client.upload(&b"raw document"[..]).await.unwrap();

    assert_eq!(name, "abc.txt");
}

#[tokio::test]
async fn test_upload_file_reads_from_disk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/documents/input"))
        .and(body_bytes(b"file content".to_vec()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"input_filename": "from-disk"})),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let input = temp_dir.path().join("input.txt");
    std::fs::write(&input, b"file content").unwrap();

    let (client, _) = client_for(&server);
    assert_eq!(client.upload_file(&input).await.unwrap(), "from-disk");

    let missing = temp_dir.path().join("missing.txt");
    let err = client.upload_file(&missing).await.unwrap_err();
    assert!(matches!(err, ClientError::Io { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_submit_sends_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/reference/reference/in-1"))
        .and(query_param("a", "1"))
        .and(query_param("b", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "task-9"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let params = PredictParams::new().with("a", "1").with("b", "2");
    let task_id = client
        .submit("reference", "in-1", Some(&params))
        .await
        .unwrap();

    assert_eq!(task_id, "task-9");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("a=1&b=2"));
}

#[tokio::test]
async fn test_error_statuses_are_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/documents/input"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/documents/output/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/reference/reference/in-1"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);

    let err = client.upload(&b"x"[..]).await.unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { status: 500, .. }));

    let err = client.download("gone").await.unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { status: 404, .. }));

    let err = client.submit("reference", "in-1", None).await.unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { status: 403, .. }));

    let err = client
        .poll_status("reference", "task-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_task_failure_is_reported_without_cancel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(SequenceResponder::new(vec![
            pending_status(),
            completed_status(Some("unsupported format")),
        ]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CANCEL_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .await_completion("reference", "task-1")
        .await
        .unwrap_err();

    match err {
        ClientError::TaskFailed { message, .. } => assert_eq!(message, "unsupported format"),
        other => panic!("Expected TaskFailed, got: {other:?}"),
    }
    assert_eq!(requests_to(&server, STATUS_PATH).await, 2);
}

#[tokio::test]
async fn test_timeout_cancels_task_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(pending_status())
        .expect(100)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CANCEL_PATH))
        .and(header("user-key", TEST_USER_KEY))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (client, sleeper) = client_for(&server);
    let err = client
        .await_completion("reference", "task-1")
        .await
        .unwrap_err();

    assert!(
        matches!(err, ClientError::Timeout { attempts: 100, .. }),
        "got: {err:?}"
    );
    assert_eq!(sleeper.recorded().len(), 100);
}

#[tokio::test]
async fn test_poll_failure_cancels_task_and_keeps_original_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(SequenceResponder::new(vec![
            pending_status(),
            ResponseTemplate::new(500),
        ]))
        .mount(&server)
        .await;
    // The cancel itself fails; the caller must still see the status error.
    Mock::given(method("GET"))
        .and(path(CANCEL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let err = client
        .await_completion("reference", "task-1")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(requests_to(&server, STATUS_PATH).await, 2);
}

#[tokio::test]
async fn test_custom_poll_policy_limits_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(pending_status())
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CANCEL_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server);
    let client = client.with_poll_policy(PollPolicy::with_max_polls(5));
    let err = client
        .await_completion("reference", "task-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout { attempts: 5, .. }));
}

#[tokio::test]
async fn test_ping_works_without_user_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ping": "pong"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::anonymous().with_endpoint(format!("{}/v1", server.uri()));
    let client = Client::new(config).unwrap();
    let payload = client.ping().await.unwrap();

    assert_eq!(payload, serde_json::json!({"ping": "pong"}));
    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("user-key"));
    assert!(!requests[0].headers.contains_key("cache-control"));
}

#[tokio::test]
async fn test_anonymous_client_rejects_authenticated_calls() {
    let server = MockServer::start().await;
    let config = ClientConfig::anonymous().with_endpoint(format!("{}/v1", server.uri()));
    let client = Client::new(config).unwrap();

    let err = client.download("in-1").await.unwrap_err();

    assert!(matches!(err, ClientError::MissingUserKey));
    assert!(server.received_requests().await.unwrap().is_empty());
}
