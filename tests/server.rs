//! HTTP API tests: documents CRUD and the SSE edit endpoint.
//!
//! Each test starts the real router on an ephemeral port and talks to it
//! with reqwest.

mod common;

use serde_json::{json, Value};
use std::sync::Arc;

use common::ScriptedModel;
use docedit::config::Config;
use docedit::server::{router, AppState};
use docedit::store::memory::{InMemoryStore, SAMPLE_DOCUMENT_ID};
use docedit::store::DocumentStore;
use docedit::{Document, EditOrchestrator, EditSettings, StreamEvent};

/// Starts the server and returns its base URL.
async fn start(store: Arc<InMemoryStore>, model: Arc<ScriptedModel>) -> String {
    let orchestrator = EditOrchestrator::new(store, model, EditSettings::default());
    let app = router(&Config::minimal(), AppState::new(orchestrator)).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn idle_model() -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel::answering("no intent here", &[]))
}

/// Decodes every `data:` frame of an SSE body.
fn sse_events(body: &str) -> Vec<StreamEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_and_root() {
    let base = start(Arc::new(InMemoryStore::new()), idle_model()).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let root: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(root["name"], "docedit");
    assert!(root["endpoints"]["chat"].as_str().unwrap().contains("/api/chat/stream"));
}

#[tokio::test]
async fn test_documents_crud() {
    let base = start(Arc::new(InMemoryStore::with_sample()), idle_model()).await;
    let client = reqwest::Client::new();

    let listed: Vec<Document> = client
        .get(format!("{}/api/documents", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, SAMPLE_DOCUMENT_ID);

    let created: Document = client
        .post(format!("{}/api/documents", base))
        .json(&json!({ "title": "Notes", "content": "one\ntwo" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created.title, "Notes");
    assert!(!created.id.is_empty());

    let updated: Document = client
        .put(format!("{}/api/documents/{}", base, created.id))
        .json(&json!({ "content": "one\ntwo\nthree" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated.title, "Notes");
    assert_eq!(updated.content, "one\ntwo\nthree");

    let fetched: Document = client
        .get(format!("{}/api/documents/{}", base, created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.content, "one\ntwo\nthree");

    let resp = client
        .delete(format!("{}/api/documents/{}", base, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/documents/{}", base, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_create_requires_title() {
    let base = start(Arc::new(InMemoryStore::new()), idle_model()).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/documents", base))
        .json(&json!({ "title": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_chat_stream_applies_edit() {
    let store = Arc::new(InMemoryStore::new());
    store.insert(Document::with_id("doc", "Test", "A\nB\nC")).unwrap();
    let model = Arc::new(ScriptedModel::answering(
        r#"{"operation": "insert", "line_start": 1, "line_end": null, "description": "greeting"}"#,
        &["HEL", "LO"],
    ));
    let base = start(store.clone(), model).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat/stream/doc", base))
        .json(&json!({ "prompt": "say hello after line 1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"), "{}", content_type);
    assert_eq!(resp.headers()["x-accel-buffering"], "no");

    let events = sse_events(&resp.text().await.unwrap());
    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec!["thinking", "highlight", "thinking", "token", "token", "edit", "done"]
    );

    let doc = store.fetch("doc").await.unwrap().unwrap();
    assert_eq!(doc.content, "A\nHELLO\nB\nC");
}

#[tokio::test]
async fn test_chat_stream_reports_errors_in_band() {
    let base = start(Arc::new(InMemoryStore::new()), idle_model()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat/stream/nope", base))
        .json(&json!({ "prompt": "edit it" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let events = sse_events(&resp.text().await.unwrap());
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error { message } => assert!(message.contains("nope")),
        other => panic!("expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_stream_rejects_empty_prompt() {
    let store = Arc::new(InMemoryStore::with_sample());
    let base = start(store, idle_model()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat/stream/{}", base, SAMPLE_DOCUMENT_ID))
        .json(&json!({ "prompt": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
