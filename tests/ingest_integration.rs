use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobtrack::config::IngestConfig;
use jobtrack::connectors::GmailApiConnector;
use jobtrack::ingest::{Delay, GmailIngestor, IngestionState, Ingestor, SyncOutcome};

#[derive(Clone, Default)]
struct RecordingDelay {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

#[async_trait(?Send)]
impl Delay for RecordingDelay {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().expect("pause log").push(duration);
    }
}

fn list_body(ids: &[&str]) -> serde_json::Value {
    json!({
        "messages": ids.iter().map(|id| json!({ "id": id, "threadId": id })).collect::<Vec<_>>(),
        "resultSizeEstimate": ids.len()
    })
}

fn html_message(id: &str, subject: &str) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": id,
        "snippet": format!("snippet for {id}"),
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [
                { "name": "subject", "value": subject },
                { "name": "from", "value": "Talent Team <talent@globex.example>" },
                { "name": "date", "value": "Tue, 06 Jan 2026 15:04:05 +0000" }
            ],
            "parts": [
                { "mimeType": "text/plain", "body": { "data": "cGxhaW4gdmVyc2lvbg" } },
                {
                    "mimeType": "text/html; charset=UTF-8",
                    "body": { "data": "PHA-SGVsbG8gPGI-dGVhbTwvYj4hPC9wPg" }
                }
            ]
        }
    })
}

async fn mount_list(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .and(query_param("maxResults", "10"))
        .and(query_param("q", "category:primary"))
        .and(header("authorization", "Bearer gmail-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(ids)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/users/me/messages/{id}")))
        .and(query_param("format", "full"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn incremental_runs_against_gmail_api() {
    let server = MockServer::start().await;
    mount_list(&server, &["m2", "m1"]).await;
    mount_detail(
        &server,
        "m2",
        ResponseTemplate::new(200).set_body_json(html_message("m2", "Interview invitation")),
    )
    .await;
    mount_detail(
        &server,
        "m1",
        ResponseTemplate::new(200).set_body_json(html_message("m1", "Application received")),
    )
    .await;

    let delay = RecordingDelay::default();
    let ingestor = Ingestor::with_delay(
        GmailApiConnector::with_base_url(&server.uri()),
        delay.clone(),
        IngestConfig::default(),
    );

    let state = ingestor.ingest("gmail-token", IngestionState::default()).await;
    assert_eq!(state.watermark_id.as_deref(), Some("m2"));
    assert_eq!(state.messages.len(), 2);
    let newest = &state.messages[0];
    assert_eq!(newest.subject, "Interview invitation");
    assert_eq!(newest.from, "Talent Team <talent@globex.example>");
    assert_eq!(newest.body, "Hello team!");
    assert_eq!(newest.snippet, "snippet for m2");
    server.verify().await;

    // A new message arrives; only it is fetched, and a 429 on another is skipped.
    server.reset().await;
    mount_list(&server, &["m4", "m3", "m2", "m1"]).await;
    mount_detail(
        &server,
        "m4",
        ResponseTemplate::new(200).set_body_json(html_message("m4", "Offer letter")),
    )
    .await;
    mount_detail(&server, "m3", ResponseTemplate::new(429)).await;

    let (state, report) = ingestor.run("gmail-token", state).await;
    assert_eq!(report.attempted, 2);
    assert_eq!(report.added, 1);
    assert_eq!(report.rate_limited, 1);
    let ids: Vec<&str> = state.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m4", "m2", "m1"]);
    assert_eq!(state.watermark_id.as_deref(), Some("m4"));
    server.verify().await;

    let pauses = delay.pauses.lock().expect("pause log").clone();
    assert_eq!(
        pauses,
        vec![
            Duration::from_millis(50),
            Duration::from_millis(50),
            Duration::from_millis(1000),
        ]
    );
}

#[tokio::test]
async fn list_failure_leaves_host_state_and_flags_clear() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let ingestor = Ingestor::with_delay(
        GmailApiConnector::with_base_url(&server.uri()),
        RecordingDelay::default(),
        IngestConfig::default(),
    );
    let mut host = GmailIngestor::new(ingestor);

    match host.connect("gmail-token").await {
        SyncOutcome::Completed(report) => {
            assert_eq!(report.listed, 0);
            assert_eq!(report.errors.len(), 1);
            assert!(report.errors[0].contains("status=401"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(host.messages().is_empty());
    assert!(host.watermark_id().is_none());
    assert!(host.last_sync().is_some());
    assert!(!host.is_loading());
    assert!(!host.is_syncing());
}
