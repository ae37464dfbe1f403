//! # docedit
//!
//! **Backend for an AI-assisted document editor.**
//!
//! A client submits a natural-language instruction against a stored
//! document. docedit asks a language model which lines the instruction
//! targets, has it write the new text, splices that text into the document,
//! and streams every step back to the client as server-sent events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  prompt   ┌──────────────────┐  messages  ┌─────────────┐
//! │  Client  │──────────▶│ EditOrchestrator │───────────▶│ LanguageModel│
//! │ (SSE)    │◀──────────│ intent/gen/apply │◀───────────│ OpenAI/Groq │
//! └──────────┘  events   └────────┬─────────┘  fragments └─────────────┘
//!                                 │ fetch / commit
//!                                 ▼
//!                          ┌─────────────┐
//!                          │DocumentStore│
//!                          └─────────────┘
//! ```
//!
//! ## Event Stream
//!
//! | type | field | meaning |
//! |------|-------|---------|
//! | `thinking` | `content` | status narration |
//! | `highlight` | `line` | line about to change |
//! | `token` | `content` | one generated fragment |
//! | `edit` | `operation` | the committed edit |
//! | `done` | `summary` | completion message |
//! | `error` | `message` | terminal failure |
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`llm`] | OpenAI-compatible chat backend, disabled backend, provider selection |
//! | [`orchestrator`] | Streaming edit pipeline with cancellation and timeouts |
//! | [`server`] | Axum HTTP API: documents CRUD and the SSE edit endpoint |
//! | [`edit_cmd`] | `docedit edit` / `docedit lines` against local files |
//! | [`progress`] | CLI event reporting (human or JSON lines) |
//!
//! Line buffer, intent parsing, generation, edit application, and the store
//! and model traits live in [`docedit_core`].

pub mod config;
pub mod edit_cmd;
pub mod llm;
pub mod orchestrator;
pub mod progress;
pub mod server;

pub use docedit_core::store;
pub use docedit_core::{Document, EditError, EditIntent, EditKind, EditOperation, StreamEvent};
pub use orchestrator::{EditOrchestrator, EditSettings, EventSink};
