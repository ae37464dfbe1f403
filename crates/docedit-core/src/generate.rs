//! Content generation for insert and replace edits.
//!
//! The model gets a window of lines around the target plus the intent's
//! description, and must answer with bare text. Deletes never reach the
//! model.

use futures::StreamExt;

use crate::error::EditError;
use crate::lines::{context_window, read_lines};
use crate::llm::{fragments_stream, LanguageModel, TokenStream};
use crate::models::{EditIntent, EditKind, Message};

/// Lines of context shown on each side of the target line.
pub const DEFAULT_CONTEXT_LINES: usize = 4;

const GENERATE_SYSTEM_PROMPT: &str = "You are a document editing assistant. Write the content the user asked for.
Match the style of the surrounding document. Be concise and relevant.
Reply with ONLY the content itself: no explanations, no preamble, no markdown code fences around it.";

/// Builds the message sequence for one generation call.
pub fn generation_messages(intent: &EditIntent, content: &str, radius: usize) -> Vec<Message> {
    let lines = read_lines(content);
    let context = context_window(&lines, intent.line_start, radius);
    vec![
        Message::system(GENERATE_SYSTEM_PROMPT),
        Message::user(format!(
            "Document context around line {}:\n```\n{}\n```\n\nUser wants to {} at line {}: {}\n\nGenerate the content:",
            intent.line_start, context, intent.operation, intent.line_start, intent.description
        )),
    ]
}

/// Generates the full replacement text in one call.
///
/// Returns `""` for deletes without calling the model.
pub async fn generate_content(
    model: &dyn LanguageModel,
    intent: &EditIntent,
    content: &str,
    radius: usize,
) -> Result<String, EditError> {
    if intent.operation == EditKind::Delete {
        return Ok(String::new());
    }
    let messages = generation_messages(intent, content, radius);
    let raw = model
        .complete(&messages)
        .await
        .map_err(|e| EditError::Generation(e.to_string()))?;
    Ok(finish_content(&raw))
}

/// Starts incremental generation.
///
/// The fragments are raw; the caller accumulates them and passes the
/// concatenation through [`finish_content`]. Deletes get an empty stream.
pub async fn generate_stream(
    model: &dyn LanguageModel,
    intent: &EditIntent,
    content: &str,
    radius: usize,
) -> Result<TokenStream, EditError> {
    if intent.operation == EditKind::Delete {
        return Ok(fragments_stream(Vec::new()));
    }
    let messages = generation_messages(intent, content, radius);
    model
        .stream(&messages)
        .await
        .map_err(|e| EditError::Generation(e.to_string()))
}

/// Drains a fragment stream into finished content.
pub async fn collect_stream(mut stream: TokenStream) -> Result<String, EditError> {
    let mut raw = String::new();
    while let Some(fragment) = stream.next().await {
        raw.push_str(&fragment.map_err(|e| EditError::Generation(e.to_string()))?);
    }
    Ok(finish_content(&raw))
}

/// Final cleanup applied to generated text before it is spliced in.
pub fn finish_content(raw: &str) -> String {
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
        fragments: Vec<&'static str>,
    }

    impl Echo {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fragments,
            }
        }
    }

    #[async_trait]
    impl LanguageModel for Echo {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fragments.concat())
        }

        async fn stream(&self, _messages: &[Message]) -> Result<TokenStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(fragments_stream(
                self.fragments.iter().map(|s| s.to_string()).collect(),
            ))
        }
    }

    fn intent(kind: EditKind) -> EditIntent {
        EditIntent {
            operation: kind,
            line_start: 2,
            line_end: None,
            description: "a greeting".into(),
        }
    }

    #[tokio::test]
    async fn delete_never_calls_the_model() {
        let model = Echo::new(vec!["nope"]);
        let out = generate_content(&model, &intent(EditKind::Delete), "A\nB", 4)
            .await
            .unwrap();
        assert_eq!(out, "");
        let stream = generate_stream(&model, &intent(EditKind::Delete), "A\nB", 4)
            .await
            .unwrap();
        assert_eq!(collect_stream(stream).await.unwrap(), "");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whole_and_incremental_modes_agree() {
        let model = Echo::new(vec!["  Hel", "lo", "\nworld \n"]);
        let whole = generate_content(&model, &intent(EditKind::Insert), "A\nB", 4)
            .await
            .unwrap();
        let stream = generate_stream(&model, &intent(EditKind::Insert), "A\nB", 4)
            .await
            .unwrap();
        let streamed = collect_stream(stream).await.unwrap();
        assert_eq!(whole, "Hello\nworld");
        assert_eq!(whole, streamed);
    }

    #[test]
    fn prompt_includes_context_and_description() {
        let msgs = generation_messages(&intent(EditKind::Replace), "A\nB\nC\nD\nE\nF", 1);
        let user = &msgs[1].content;
        assert!(user.contains("```\nA\nB\nC\n```"));
        assert!(user.contains("replace at line 2: a greeting"));
    }
}
