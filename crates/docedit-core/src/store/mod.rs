//! Document storage abstraction.
//!
//! The edit pipeline needs only two things from storage: read the current
//! content of a document, and commit a new content blob. [`DocumentStore`]
//! exposes those plus the CRUD operations the HTTP API serves, so backends
//! are pluggable and tests can inject stores that fail on purpose.
//!
//! Implementations must be `Send + Sync` and are responsible for their own
//! consistency under concurrent access; the pipeline does no locking.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Document;

/// Body of a document create request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Partial document update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Abstract document storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch`](DocumentStore::fetch) | Read a document by id |
/// | [`commit`](DocumentStore::commit) | Replace a document's content |
/// | [`list`](DocumentStore::list) | All documents, oldest first |
/// | [`create`](DocumentStore::create) | Insert a new document |
/// | [`update`](DocumentStore::update) | Change title and/or content |
/// | [`delete`](DocumentStore::delete) | Remove a document |
///
/// `Ok(None)` / `Ok(false)` mean "no such document"; `Err` means the
/// backend itself failed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<Document>>;

    /// Replaces the content of `id`, returning the updated document.
    async fn commit(&self, id: &str, content: String) -> Result<Option<Document>>;

    async fn list(&self) -> Result<Vec<Document>>;

    async fn create(&self, doc: NewDocument) -> Result<Document>;

    async fn update(&self, id: &str, update: DocumentUpdate) -> Result<Option<Document>>;

    async fn delete(&self, id: &str) -> Result<bool>;
}
