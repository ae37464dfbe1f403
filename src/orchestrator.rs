//! Streaming edit orchestrator.
//!
//! Drives one edit request from instruction to committed content while
//! reporting progress as an ordered sequence of [`StreamEvent`]s:
//!
//! ```text
//! lookup ─▶ thinking ─▶ extract intent ─▶ highlight
//!    ├─ delete ──────────────▶ token ──────────────┐
//!    └─ insert/replace ─▶ thinking ─▶ token* ──────┤
//!                                                  ▼
//!                                 apply ─▶ edit ─▶ done
//!
//! any step ─▶ error (terminal)
//! ```
//!
//! The pipeline is a straight line of fallible steps. The first failure
//! short-circuits the rest and is reported as exactly one `error` event,
//! which is always the last event of the stream.
//!
//! # Cancellation
//!
//! Events flow through a bounded channel. When the receiving side is
//! dropped (the client disconnected), any in-flight model call is dropped
//! as soon as the closure is noticed and nothing is committed. Generated
//! text that never reached the applier is discarded.
//!
//! # Timeouts
//!
//! `llm.timeout_secs` bounds the intent call, and separately the whole
//! content generation (a single deadline shared by every fragment). A
//! timeout is reported as an `error` event and never retried.

use futures::{FutureExt, Stream, StreamExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use docedit_core::apply::apply_edit;
use docedit_core::generate::{finish_content, generate_stream};
use docedit_core::intent::extract_intent;
use docedit_core::llm::LanguageModel;
use docedit_core::models::{EditIntent, EditKind, EditOperation, StreamEvent};
use docedit_core::store::DocumentStore;
use docedit_core::EditError;

use crate::config::Config;

/// Tuning knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct EditSettings {
    pub context_lines: usize,
    pub timeout: Duration,
    pub channel_capacity: usize,
}

impl EditSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            context_lines: config.editor.context_lines,
            timeout: Duration::from_secs(config.llm.timeout_secs),
            channel_capacity: config.editor.channel_capacity,
        }
    }
}

impl Default for EditSettings {
    fn default() -> Self {
        Self::from_config(&Config::minimal())
    }
}

/// Sending half of one request's event stream.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Delivers one event, or fails with [`EditError::Cancelled`] when the
    /// client is gone.
    pub async fn emit(&self, event: StreamEvent) -> Result<(), EditError> {
        self.tx.send(event).await.map_err(|_| EditError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the receiving side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Runs edit requests against a store and a language model.
///
/// Cheap to clone; collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct EditOrchestrator {
    store: Arc<dyn DocumentStore>,
    model: Arc<dyn LanguageModel>,
    settings: EditSettings,
}

impl EditOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn LanguageModel>,
        settings: EditSettings,
    ) -> Self {
        Self {
            store,
            model,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Starts a request on a background task and returns its event stream.
    ///
    /// Dropping the returned stream cancels the request.
    pub fn spawn(
        &self,
        document_id: String,
        prompt: String,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let this = self.clone();
        tokio::spawn(async move {
            this.run(&document_id, &prompt, &EventSink::new(tx)).await;
        });
        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    /// Runs a request to completion and returns every event it produced.
    pub async fn collect(&self, document_id: &str, prompt: &str) -> Vec<StreamEvent> {
        self.spawn(document_id.to_string(), prompt.to_string())
            .collect()
            .await
    }

    /// Runs one request, emitting its events into `sink`.
    ///
    /// Never fails: every error becomes the final `error` event, and so
    /// does a panic in any step.
    pub async fn run(&self, document_id: &str, prompt: &str, sink: &EventSink) {
        let outcome = AssertUnwindSafe(self.drive(document_id, prompt, sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(EditError::Internal(panic_message(panic.as_ref()))));
        match outcome {
            Ok(op) => {
                tracing::info!(
                    document_id,
                    operation = %op.operation,
                    line_start = op.line_start,
                    "edit committed"
                );
            }
            Err(EditError::Cancelled) => {
                tracing::debug!(document_id, "client disconnected, request abandoned");
            }
            Err(e) => {
                tracing::warn!(document_id, code = e.code(), "edit failed: {}", e);
                let _ = sink.emit(StreamEvent::error(e.to_string())).await;
            }
        }
    }

    async fn drive(
        &self,
        document_id: &str,
        prompt: &str,
        sink: &EventSink,
    ) -> Result<EditOperation, EditError> {
        tracing::debug!(document_id, "lookup");
        let document = self
            .store
            .fetch(document_id)
            .await
            .map_err(|e| EditError::Store(e.to_string()))?
            .ok_or_else(|| EditError::NotFound(document_id.to_string()))?;

        sink.emit(StreamEvent::thinking("Analyzing your request..."))
            .await?;

        tracing::debug!(document_id, "extracting intent");
        let deadline = Instant::now() + self.settings.timeout;
        let intent = self
            .guarded(
                sink,
                deadline,
                "Intent extraction",
                extract_intent(self.model.as_ref(), &document.content, prompt),
            )
            .await?;
        tracing::debug!(document_id, ?intent, "intent parsed");

        sink.emit(StreamEvent::Highlight {
            line: intent.line_start,
        })
        .await?;

        let (new_content, summary) = match intent.operation {
            EditKind::Delete => {
                let range = intent.range_label();
                sink.emit(StreamEvent::token(format!("Deleting line(s) {}", range)))
                    .await?;
                (String::new(), format!("Deleted line(s) {}", range))
            }
            kind => {
                sink.emit(StreamEvent::thinking(format!(
                    "Generating content for {} at line {}...",
                    kind, intent.line_start
                )))
                .await?;
                let content = self.stream_content(&intent, &document.content, sink).await?;
                (
                    content,
                    format!("{} content at line {}", kind.past_tense(), intent.line_start),
                )
            }
        };

        let operation = intent.into_operation(new_content);

        if sink.is_closed() {
            return Err(EditError::Cancelled);
        }
        tracing::debug!(document_id, "applying edit");
        apply_edit(self.store.as_ref(), document_id, &operation).await?;

        sink.emit(StreamEvent::Edit {
            operation: operation.clone(),
        })
        .await?;
        sink.emit(StreamEvent::Done { summary }).await?;

        Ok(operation)
    }

    /// Streams generated fragments to the client and returns the finished text.
    async fn stream_content(
        &self,
        intent: &EditIntent,
        content: &str,
        sink: &EventSink,
    ) -> Result<String, EditError> {
        let deadline = Instant::now() + self.settings.timeout;
        let mut stream = self
            .guarded(
                sink,
                deadline,
                "Generation",
                generate_stream(
                    self.model.as_ref(),
                    intent,
                    content,
                    self.settings.context_lines,
                ),
            )
            .await?;

        let mut raw = String::new();
        loop {
            let next = self
                .guarded(sink, deadline, "Generation", async {
                    Ok(stream.next().await)
                })
                .await?;
            match next {
                Some(Ok(fragment)) => {
                    raw.push_str(&fragment);
                    sink.emit(StreamEvent::token(fragment)).await?;
                }
                Some(Err(e)) => return Err(EditError::Generation(e.to_string())),
                None => break,
            }
        }

        Ok(finish_content(&raw))
    }

    /// Awaits `fut` unless the deadline passes or the client disconnects first.
    async fn guarded<T, F>(
        &self,
        sink: &EventSink,
        deadline: Instant,
        phase: &'static str,
        fut: F,
    ) -> Result<T, EditError>
    where
        F: Future<Output = Result<T, EditError>>,
    {
        tokio::select! {
            biased;
            _ = sink.closed() => Err(EditError::Cancelled),
            res = tokio::time::timeout_at(deadline, fut) => {
                res.unwrap_or(Err(EditError::Timeout {
                    phase,
                    after: self.settings.timeout,
                }))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "pipeline step panicked".to_string())
}
