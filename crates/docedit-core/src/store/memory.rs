//! In-memory [`DocumentStore`] for the server, the CLI, and tests.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Nothing is persisted.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::Document;

use super::{DocumentStore, DocumentUpdate, NewDocument};

/// Identifier of the welcome document seeded by [`InMemoryStore::with_sample`].
pub const SAMPLE_DOCUMENT_ID: &str = "sample-doc-1";

const SAMPLE_TITLE: &str = "Welcome Document";

const SAMPLE_CONTENT: &str = "# Welcome to docedit

This document shows what the **AI-assisted editor** can do.

## Features

- Edit by describing the change in plain language
- *Streaming* updates as the new text is written
- Insert, replace, and delete by line number

## Getting Started

1. Type an instruction in the chat panel
2. Watch the highlighted line change
3. Ask for insertions, rewrites, or deletions

> **Tip:** line numbers are 1-indexed, so \"after line 1\" means below the title.

## Example Commands

- \"Add a paragraph about machine learning after line 10\"
- \"Replace line 3 with a better introduction\"
- \"Delete lines 14-16\"

---

*Happy editing!*";

/// In-memory document store.
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// A store holding the welcome document under [`SAMPLE_DOCUMENT_ID`].
    pub fn with_sample() -> Self {
        let doc = Document::with_id(SAMPLE_DOCUMENT_ID, SAMPLE_TITLE, SAMPLE_CONTENT);
        Self {
            docs: RwLock::new(HashMap::from([(doc.id.clone(), doc)])),
        }
    }

    /// Inserts or overwrites a document as-is.
    pub fn insert(&self, doc: Document) -> Result<()> {
        self.write()?.insert(doc.id.clone(), doc);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Document>>> {
        self.docs
            .read()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Document>>> {
        self.docs
            .write()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn fetch(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn commit(&self, id: &str, content: String) -> Result<Option<Document>> {
        let mut docs = self.write()?;
        Ok(docs.get_mut(id).map(|doc| {
            doc.set_content(content);
            doc.clone()
        }))
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let mut all: Vec<Document> = self.read()?.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn create(&self, doc: NewDocument) -> Result<Document> {
        let doc = Document::new(doc.title, doc.content);
        self.write()?.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn update(&self, id: &str, update: DocumentUpdate) -> Result<Option<Document>> {
        let mut docs = self.write()?;
        Ok(docs.get_mut(id).map(|doc| {
            if let Some(title) = update.title {
                doc.title = title;
            }
            if let Some(content) = update.content {
                doc.set_content(content);
            }
            doc.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.write()?.remove(id).is_some())
    }
}
