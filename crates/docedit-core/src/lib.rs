//! # docedit Core
//!
//! Shared, WASM-safe logic for docedit: the document and edit data model,
//! the line buffer, intent extraction, content generation, edit application,
//! and the storage and language-model traits.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. Concrete
//! language-model backends and the streaming orchestrator live in the
//! `docedit` app crate.
//!
//! ## Pipeline
//!
//! ```text
//! instruction ──▶ intent ──▶ generate ──▶ apply ──▶ DocumentStore::commit
//!                   │           │            │
//!                   ▼           ▼            ▼
//!               EditIntent   fragments   EditOperation
//! ```

pub mod apply;
pub mod error;
pub mod generate;
pub mod intent;
pub mod lines;
pub mod llm;
pub mod models;
pub mod store;

pub use error::EditError;
pub use models::{Document, EditIntent, EditKind, EditOperation, Message, Role, StreamEvent};
