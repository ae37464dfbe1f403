//! Intent extraction: free-text instruction → [`EditIntent`].
//!
//! The model sees the document with line numbers and is asked for a single
//! JSON object. Its answer is untrusted: it may wrap the object in prose,
//! put braces inside the description, or invent an operation. Parsing
//! therefore locates the first *balanced* object with a scanner that knows
//! about JSON string literals, decodes it, and checks each field.
//!
//! Line numbers are not checked against the document here; the applier
//! does that against a fresh read.

use serde_json::Value;

use crate::error::EditError;
use crate::lines::number_lines;
use crate::llm::LanguageModel;
use crate::models::{EditIntent, EditKind, Message};

const INTENT_SYSTEM_PROMPT: &str = r#"You are a document editing assistant. Read the user's request and work out which edit it asks for.

Decide:
1. operation: "insert", "replace", or "delete"
2. line_start: the first line affected (1-indexed). For insert, the new text goes after this line.
3. line_end: the last line affected for multi-line replace/delete, otherwise null
4. description: what content should be written (empty for delete)

Answer with ONE JSON object on a single line and nothing else:
{"operation": "insert|replace|delete", "line_start": <number>, "line_end": <number or null>, "description": "what to generate"}

Examples:
- "Add a paragraph about AI after line 5" -> {"operation": "insert", "line_start": 5, "line_end": null, "description": "a paragraph about AI"}
- "Replace lines 10-12 with a summary" -> {"operation": "replace", "line_start": 10, "line_end": 12, "description": "a summary"}
- "Delete line 3" -> {"operation": "delete", "line_start": 3, "line_end": 3, "description": ""}"#;

/// Builds the message sequence for one intent-extraction call.
pub fn intent_messages(content: &str, instruction: &str) -> Vec<Message> {
    vec![
        Message::system(INTENT_SYSTEM_PROMPT),
        Message::user(format!(
            "Document content (with line numbers):\n{}\n\nUser request: {}\n\nExtract the intent as JSON:",
            number_lines(content),
            instruction
        )),
    ]
}

/// Asks `model` what `instruction` means for `content`.
///
/// Issues exactly one non-streaming call. Model failures surface as
/// [`EditError::Generation`], unusable answers as [`EditError::IntentParse`].
pub async fn extract_intent(
    model: &dyn LanguageModel,
    content: &str,
    instruction: &str,
) -> Result<EditIntent, EditError> {
    let messages = intent_messages(content, instruction);
    let response = model
        .complete(&messages)
        .await
        .map_err(|e| EditError::Generation(e.to_string()))?;
    parse_intent(&response)
}

/// Parses a model response into an [`EditIntent`].
pub fn parse_intent(response: &str) -> Result<EditIntent, EditError> {
    let raw = first_json_object(response)
        .ok_or_else(|| EditError::IntentParse("no JSON object in response".to_string()))?;

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| EditError::IntentParse(format!("JSON parse error: {}", e)))?;

    let operation = match value.get("operation") {
        Some(Value::String(s)) => EditKind::parse(&s.trim().to_lowercase()).ok_or_else(|| {
            EditError::IntentParse(format!("unrecognized operation '{}'", s))
        })?,
        Some(other) => {
            return Err(EditError::IntentParse(format!(
                "operation must be a string, got {}",
                other
            )))
        }
        None => return Err(EditError::IntentParse("missing operation".to_string())),
    };

    let line_start = match value.get("line_start").and_then(as_line_number) {
        Some(n) if n >= 1 => n,
        Some(_) => {
            return Err(EditError::IntentParse(
                "line_start must be >= 1".to_string(),
            ))
        }
        None => {
            return Err(EditError::IntentParse(
                "missing or non-numeric line_start".to_string(),
            ))
        }
    };

    let line_end = match value.get("line_end") {
        None | Some(Value::Null) => None,
        Some(v) => Some(as_line_number(v).ok_or_else(|| {
            EditError::IntentParse(format!("line_end must be a number or null, got {}", v))
        })?),
    };

    let description = value
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(EditIntent {
        operation,
        line_start,
        line_end,
        description,
    })
}

/// Accepts `5`, `5.0`, and `"5"`; models are not consistent about it.
fn as_line_number(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Returns the first balanced `{ ... }` substring of `text`.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count toward nesting.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
