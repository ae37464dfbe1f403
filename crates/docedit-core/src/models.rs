//! Core data models for the edit pipeline.
//!
//! A [`Document`] owns a single content blob; every line-addressed view of
//! it is derived on demand. An [`EditIntent`] is what the model thinks the
//! user asked for, an [`EditOperation`] is that intent plus the generated
//! text, and a [`StreamEvent`] is one frame of progress sent to the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lines;

/// A stored text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document with a fresh UUID v4 identifier.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, content)
    }

    /// Creates a document with a caller-chosen identifier.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The line view of the current content (1-indexed by position).
    pub fn lines(&self) -> Vec<&str> {
        lines::read_lines(&self.content)
    }

    /// Returns line `n` (1-indexed), or `None` when out of range.
    pub fn line(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.content.split('\n').nth(n - 1)
    }

    /// Replaces the content and bumps `updated_at`.
    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.updated_at = Utc::now();
    }
}

/// The kind of mutation an edit performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Replace,
    Delete,
}

impl EditKind {
    /// Parses the wire name (`"insert"`, `"replace"`, `"delete"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(EditKind::Insert),
            "replace" => Some(EditKind::Replace),
            "delete" => Some(EditKind::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditKind::Insert => "insert",
            EditKind::Replace => "replace",
            EditKind::Delete => "delete",
        }
    }

    /// Past-tense verb used in completion summaries.
    pub fn past_tense(&self) -> &'static str {
        match self {
            EditKind::Insert => "Inserted",
            EditKind::Replace => "Replaced",
            EditKind::Delete => "Deleted",
        }
    }
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured reading of a free-text instruction.
///
/// Line numbers are 1-indexed and unvalidated: the model may name a line
/// that does not exist, which the applier rejects later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditIntent {
    pub operation: EditKind,
    pub line_start: usize,
    pub line_end: Option<usize>,
    pub description: String,
}

impl EditIntent {
    /// `line_end`, or `line_start` when the intent targets a single line.
    pub fn resolved_end(&self) -> usize {
        self.line_end.unwrap_or(self.line_start)
    }

    /// Human-readable range, `"3"` or `"3-5"`.
    pub fn range_label(&self) -> String {
        match self.line_end {
            Some(end) => format!("{}-{}", self.line_start, end),
            None => self.line_start.to_string(),
        }
    }

    /// Attaches generated content, producing the operation to apply.
    ///
    /// Deletes always carry empty content and a resolved `line_end`.
    pub fn into_operation(self, new_content: String) -> EditOperation {
        match self.operation {
            EditKind::Delete => EditOperation {
                operation: EditKind::Delete,
                line_start: self.line_start,
                line_end: Some(self.resolved_end()),
                new_content: String::new(),
            },
            kind => EditOperation {
                operation: kind,
                line_start: self.line_start,
                line_end: self.line_end,
                new_content,
            },
        }
    }
}

/// An intent plus the text it inserts or substitutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperation {
    pub operation: EditKind,
    pub line_start: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<usize>,
    #[serde(default)]
    pub new_content: String,
}

impl EditOperation {
    pub fn resolved_end(&self) -> usize {
        self.line_end.unwrap_or(self.line_start)
    }
}

/// One progress frame sent to the client.
///
/// Serializes as a flat object tagged by `type`; each variant carries only
/// its own field, so there are never nulls on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Thinking { content: String },
    Highlight { line: usize },
    Token { content: String },
    Edit { operation: EditOperation },
    Done { summary: String },
    Error { message: String },
}

impl StreamEvent {
    pub fn thinking(content: impl Into<String>) -> Self {
        StreamEvent::Thinking {
            content: content.into(),
        }
    }

    pub fn token(content: impl Into<String>) -> Self {
        StreamEvent::Token {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Thinking { .. } => "thinking",
            StreamEvent::Highlight { .. } => "highlight",
            StreamEvent::Token { .. } => "token",
            StreamEvent::Edit { .. } => "edit",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// `done` and `error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// Speaker of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the message sequence handed to a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}
