//! Local file commands: `docedit edit` and `docedit lines`.
//!
//! `edit` runs the full streaming pipeline against a file on disk. The file
//! is loaded into an in-memory store under its path, the request runs
//! exactly as it would over HTTP, and the committed content is written back
//! once an `edit` event has been produced.
//!
//! # Usage
//!
//! ```bash
//! docedit edit notes.md "add a summary paragraph after line 3"
//! docedit edit notes.md "delete lines 10-12" --dry-run
//! docedit lines notes.md
//! ```

use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;

use docedit_core::lines::number_lines;
use docedit_core::models::{Document, StreamEvent};
use docedit_core::store::memory::InMemoryStore;
use docedit_core::store::DocumentStore;

use crate::config::Config;
use crate::llm::create_model;
use crate::orchestrator::{EditOrchestrator, EditSettings};
use crate::progress::OutputMode;

/// CLI entry point for `docedit edit <file> <prompt>`.
pub async fn run_edit(
    config: &Config,
    path: &Path,
    prompt: &str,
    dry_run: bool,
    mode: OutputMode,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let id = path.display().to_string();
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| id.clone());

    let store = Arc::new(InMemoryStore::new());
    store.insert(Document::with_id(id.clone(), title, content))?;

    let model = create_model(&config.llm)?;
    let orchestrator = EditOrchestrator::new(
        store.clone(),
        model,
        EditSettings::from_config(config),
    );

    let reporter = mode.reporter();
    let mut events = Box::pin(orchestrator.spawn(id.clone(), prompt.to_string()));
    let mut edited = false;
    let mut failed = false;
    while let Some(event) = events.next().await {
        reporter.report(&event);
        match event {
            StreamEvent::Edit { .. } => edited = true,
            StreamEvent::Error { .. } => failed = true,
            _ => {}
        }
    }

    if failed {
        std::process::exit(1);
    }

    if edited && !dry_run {
        let doc = store
            .fetch(&id)
            .await?
            .with_context(|| format!("document {} vanished from the store", id))?;
        std::fs::write(path, doc.content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("wrote {}", path.display());
    }

    Ok(())
}

/// CLI entry point for `docedit lines <file>`.
pub fn run_lines(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", number_lines(&content));
    Ok(())
}
