//! Edit application: validate an [`EditOperation`] against the document as
//! it is *now*, splice it in, and commit the result.
//!
//! The content used for intent extraction is never reused here. The applier
//! fetches a fresh copy, because the range must resolve against whatever the
//! store holds at commit time.

use crate::error::EditError;
use crate::lines::{join_lines, read_lines, splice};
use crate::models::{Document, EditKind, EditOperation};
use crate::store::DocumentStore;

/// Checks that an edit's range resolves against `line_count` lines.
///
/// - every kind: `start >= 1`
/// - insert: `start <= line_count` (inserting after the last line appends)
/// - replace/delete: `start <= end <= line_count`, `end` defaulting to `start`
pub fn validate_range(
    kind: EditKind,
    start: usize,
    end: Option<usize>,
    line_count: usize,
) -> Result<(), EditError> {
    if start < 1 {
        return Err(EditError::InvalidRange(format!(
            "line_start must be >= 1, got {}",
            start
        )));
    }
    match kind {
        EditKind::Insert => {
            if start > line_count {
                return Err(EditError::InvalidRange(format!(
                    "cannot insert after line {}: document has {} line(s)",
                    start, line_count
                )));
            }
        }
        EditKind::Replace | EditKind::Delete => {
            let end = end.unwrap_or(start);
            if end < start {
                return Err(EditError::InvalidRange(format!(
                    "line_end {} is before line_start {}",
                    end, start
                )));
            }
            if end > line_count {
                return Err(EditError::InvalidRange(format!(
                    "lines {}-{} out of range: document has {} line(s)",
                    start, end, line_count
                )));
            }
        }
    }
    Ok(())
}

/// Applies `op` to `content` and returns the new content.
pub fn apply_to_content(content: &str, op: &EditOperation) -> Result<String, EditError> {
    let lines = read_lines(content);
    validate_range(op.operation, op.line_start, op.line_end, lines.len())?;
    let replacement = match op.operation {
        EditKind::Delete => Vec::new(),
        _ => read_lines(&op.new_content),
    };
    let out = splice(
        &lines,
        op.line_start,
        op.line_end,
        &replacement,
        op.operation,
    );
    Ok(join_lines(&out))
}

/// Validates and commits `op` against the stored document `id`.
///
/// Nothing is written unless validation passes. A vanished id maps to
/// [`EditError::NotFound`], a failed read to [`EditError::Store`], and a
/// failed write to [`EditError::Commit`].
pub async fn apply_edit(
    store: &dyn DocumentStore,
    id: &str,
    op: &EditOperation,
) -> Result<Document, EditError> {
    let current = store
        .fetch(id)
        .await
        .map_err(|e| EditError::Store(e.to_string()))?
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;

    let new_content = apply_to_content(&current.content, op)?;

    store
        .commit(id, new_content)
        .await
        .map_err(|e| EditError::Commit(e.to_string()))?
        .ok_or_else(|| EditError::NotFound(id.to_string()))
}
