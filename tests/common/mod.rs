//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docedit::store::memory::InMemoryStore;
use docedit::store::{DocumentStore, DocumentUpdate, NewDocument};
use docedit::{Document, EditOrchestrator, EditSettings, StreamEvent};
use docedit_core::llm::{LanguageModel, TokenStream};
use docedit_core::models::Message;

/// How the scripted model answers the intent call.
#[derive(Clone)]
pub enum IntentReply {
    Text(String),
    Fail(String),
    Hang,
}

/// How the scripted model streams generated content.
#[derive(Clone)]
pub enum StreamReply {
    Fragments(Vec<String>),
    /// Yields the fragments, then fails.
    FailAfter(Vec<String>, String),
    /// Yields the fragments, then never finishes.
    HangAfter(Vec<String>),
    /// Panics instead of starting the stream.
    Panic(String),
}

/// A language model that replays canned answers.
pub struct ScriptedModel {
    intent: IntentReply,
    stream: StreamReply,
    pub complete_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(intent: IntentReply, stream: StreamReply) -> Self {
        Self {
            intent,
            stream,
            complete_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        }
    }

    /// Answers the intent call with `intent_json` and streams `fragments`.
    pub fn answering(intent_json: &str, fragments: &[&str]) -> Self {
        Self::new(
            IntentReply::Text(intent_json.to_string()),
            StreamReply::Fragments(owned(fragments)),
        )
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

fn owned(fragments: &[&str]) -> Vec<String> {
    fragments.iter().map(|s| s.to_string()).collect()
}

pub fn fragments(fragments: &[&str]) -> Vec<String> {
    owned(fragments)
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        match &self.intent {
            IntentReply::Text(text) => Ok(text.clone()),
            IntentReply::Fail(msg) => Err(anyhow::anyhow!("{}", msg)),
            IntentReply::Hang => futures::future::pending::<Result<String>>().await,
        }
    }

    async fn stream(&self, _messages: &[Message]) -> Result<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let stream: TokenStream = match &self.stream {
            StreamReply::Fragments(parts) => {
                Box::pin(futures::stream::iter(parts.clone().into_iter().map(Ok::<String, anyhow::Error>)))
            }
            StreamReply::FailAfter(parts, msg) => {
                let err = anyhow::anyhow!("{}", msg);
                Box::pin(
                    futures::stream::iter(parts.clone().into_iter().map(Ok::<String, anyhow::Error>))
                        .chain(futures::stream::once(async move { Err(err) })),
                )
            }
            StreamReply::HangAfter(parts) => Box::pin(
                futures::stream::iter(parts.clone().into_iter().map(Ok::<String, anyhow::Error>))
                    .chain(futures::stream::pending::<Result<String>>()),
            ),
            StreamReply::Panic(msg) => panic!("{}", msg),
        };
        Ok(stream)
    }
}

/// Wraps an [`InMemoryStore`] but refuses every commit.
pub struct FailingStore {
    inner: InMemoryStore,
}

impl FailingStore {
    pub fn with_document(id: &str, content: &str) -> Self {
        let inner = InMemoryStore::new();
        inner.insert(Document::with_id(id, "Test", content)).unwrap();
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn fetch(&self, id: &str) -> Result<Option<Document>> {
        self.inner.fetch(id).await
    }

    async fn commit(&self, _id: &str, _content: String) -> Result<Option<Document>> {
        anyhow::bail!("disk full")
    }

    async fn list(&self) -> Result<Vec<Document>> {
        self.inner.list().await
    }

    async fn create(&self, doc: NewDocument) -> Result<Document> {
        self.inner.create(doc).await
    }

    async fn update(&self, id: &str, update: DocumentUpdate) -> Result<Option<Document>> {
        self.inner.update(id, update).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// A store holding one document `"doc"` with `content`.
pub fn store_with(content: &str) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    store.insert(Document::with_id("doc", "Test", content)).unwrap();
    Arc::new(store)
}

pub fn orchestrator(
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn LanguageModel>,
) -> EditOrchestrator {
    EditOrchestrator::new(store, model, EditSettings::default())
}

pub fn orchestrator_with_timeout(
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
) -> EditOrchestrator {
    let settings = EditSettings {
        timeout,
        ..EditSettings::default()
    };
    EditOrchestrator::new(store, model, settings)
}

/// The `type` tags of `events`, in order.
pub fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind()).collect()
}

/// Checks the ordering rules every stream must obey.
pub fn assert_well_formed(events: &[StreamEvent]) {
    let errors = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Error { .. }))
        .count();
    assert!(errors <= 1, "more than one error event: {:?}", kinds(events));
    if errors == 1 {
        assert!(
            matches!(events.last(), Some(StreamEvent::Error { .. })),
            "error is not the last event: {:?}",
            kinds(events)
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, StreamEvent::Edit { .. } | StreamEvent::Done { .. })),
            "edit/done alongside an error: {:?}",
            kinds(events)
        );
    }
    for (i, event) in events.iter().enumerate() {
        if let StreamEvent::Edit { .. } = event {
            assert!(
                matches!(events.get(i + 1), Some(StreamEvent::Done { .. })),
                "edit not followed by done: {:?}",
                kinds(events)
            );
        }
    }
    if let Some(pos) = events
        .iter()
        .position(|e| matches!(e, StreamEvent::Highlight { .. }))
    {
        assert!(
            !events[..pos]
                .iter()
                .any(|e| matches!(e, StreamEvent::Token { .. })),
            "token before highlight: {:?}",
            kinds(events)
        );
    }
}
