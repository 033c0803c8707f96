//! Assessment forwarding against a stubbed collaborator endpoint.

use voicebridge::assessment::{AssessmentSink, RecordOutcome};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_recorded_payload_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/security-assessments"))
        .and(body_partial_json(serde_json::json!({
            "employee_id": 1,
            "security_score": 80,
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let endpoint = format!("{}/api/security-assessments", server.uri());
    let dir_path = dir.path().to_path_buf();

    let outcome = tokio::task::spawn_blocking(move || {
        let sink = AssessmentSink::new(dir_path, Some(endpoint)).unwrap();
        sink.record(
            "{\"employee_id\": 1, \"security_score\": 80, \
             \"resistance_level\": \"High\", \
             \"social_engineering_susceptibility\": \"Low\"",
        )
    })
    .await
    .unwrap()
    .unwrap();

    assert!(matches!(outcome, RecordOutcome::Recorded { .. }));
    // The mock's `expect(1)` is verified on drop.
}

#[tokio::test]
async fn test_forwarding_failure_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/security-assessments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let endpoint = format!("{}/api/security-assessments", server.uri());
    let dir_path = dir.path().to_path_buf();

    // A rejected POST is logged, not raised; the payload is still on disk.
    let outcome = tokio::task::spawn_blocking(move || {
        let sink = AssessmentSink::new(dir_path, Some(endpoint)).unwrap();
        sink.record("{\"employee_id\": 2, \"security_score\": 40}")
    })
    .await
    .unwrap()
    .unwrap();

    let RecordOutcome::Recorded { path } = outcome else {
        panic!("expected Recorded outcome");
    };
    assert!(path.exists());
}

#[tokio::test]
async fn test_unparseable_payload_is_not_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/security-assessments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let endpoint = format!("{}/api/security-assessments", server.uri());
    let dir_path = dir.path().to_path_buf();

    let outcome = tokio::task::spawn_blocking(move || {
        let sink = AssessmentSink::new(dir_path, Some(endpoint)).unwrap();
        sink.record("completely [ broken")
    })
    .await
    .unwrap()
    .unwrap();

    assert!(matches!(outcome, RecordOutcome::SavedRaw { .. }));
}
