//! Language model backends.
//!
//! Implements [`LanguageModel`] for:
//! - **[`DisabledModel`]**: fails every call; used when no provider is configured.
//! - **[`OpenAiCompatibleModel`]**: any `/chat/completions` endpoint that speaks
//!   the OpenAI wire format: OpenAI itself, Groq, and Ollama's `/v1` API.
//!
//! # Provider Selection
//!
//! | Config Value | Default base URL | API key variable |
//! |-------------|------------------|------------------|
//! | `"disabled"` | n/a | n/a |
//! | `"openai"` | `https://api.openai.com/v1` | `OPENAI_API_KEY` |
//! | `"groq"` | `https://api.groq.com/openai/v1` | `GROQ_API_KEY` |
//! | `"ollama"` | `http://localhost:11434/v1` | none |
//!
//! `llm.base_url` and `llm.api_key_env` override the defaults.
//!
//! # Retries
//!
//! None. A failed generation is reported to the client as an `error` event
//! and retrying is the client's decision.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use docedit_core::llm::{LanguageModel, TokenStream};
use docedit_core::models::Message;

use crate::config::LlmConfig;

// ============ Disabled Model ============

/// A model that refuses every request.
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String> {
        bail!("LLM provider is disabled; set [llm] provider and model in the config")
    }

    async fn stream(&self, _messages: &[Message]) -> Result<TokenStream> {
        bail!("LLM provider is disabled; set [llm] provider and model in the config")
    }
}

// ============ OpenAI-compatible Model ============

/// Chat-completions client for OpenAI-compatible APIs.
pub struct OpenAiCompatibleModel {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatibleModel {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set, or if the provider needs an
    /// API key and its environment variable is missing.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for provider '{}'", config.provider))?;

        let (default_url, default_key_env) = match config.provider.as_str() {
            "openai" => ("https://api.openai.com/v1", Some("OPENAI_API_KEY")),
            "groq" => ("https://api.groq.com/openai/v1", Some("GROQ_API_KEY")),
            "ollama" => ("http://localhost:11434/v1", None),
            other => bail!("Unknown llm provider: {}", other),
        };

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_url.to_string())
            .trim_end_matches('/')
            .to_string();

        let key_env = config.api_key_env.as_deref().or(default_key_env);
        let api_key = match key_env {
            Some(var) => Some(
                std::env::var(var)
                    .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?,
            ),
            None => None,
        };

        // Only the connection is bounded; request deadlines belong to the
        // orchestrator.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            base_url,
            api_key,
            temperature: config.temperature,
            client,
        })
    }

    fn request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": stream,
        });
        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let response = self
            .request(messages, stream)
            .send()
            .await
            .with_context(|| format!("LLM connection error ({})", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("LLM API error {}: {}", status, body_text);
        }
        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let response = self.send(messages, false).await?;
        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }

    async fn stream(&self, messages: &[Message]) -> Result<TokenStream> {
        let response = self.send(messages, true).await?;
        let bytes = Box::pin(response.bytes_stream());

        let stream = futures::stream::unfold(
            (bytes, ChatStreamParser::default(), VecDeque::new()),
            |(mut bytes, mut parser, mut pending)| async move {
                loop {
                    if let Some(fragment) = pending.pop_front() {
                        return Some((Ok(fragment), (bytes, parser, pending)));
                    }
                    if parser.is_done() {
                        return None;
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => match parser.push(&chunk) {
                            Ok(fragments) => pending.extend(fragments),
                            Err(e) => {
                                parser.finish();
                                return Some((Err(e), (bytes, parser, pending)));
                            }
                        },
                        Some(Err(e)) => {
                            parser.finish();
                            return Some((
                                Err(anyhow::Error::from(e).context("LLM stream interrupted")),
                                (bytes, parser, pending),
                            ));
                        }
                        None => {
                            let tail = parser.flush();
                            parser.finish();
                            match tail {
                                Ok(fragments) => pending.extend(fragments),
                                Err(e) => return Some((Err(e), (bytes, parser, pending))),
                            }
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

/// Extracts `choices[0].message.content` from a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid LLM response: missing choices[0].message.content"))
}

/// Incremental parser for a streamed chat-completions body.
///
/// The body is server-sent events: `data: {json}` lines, each carrying a
/// `choices[0].delta.content` fragment, terminated by `data: [DONE]`.
/// Network chunks may split lines (and UTF-8 sequences) anywhere, so bytes
/// are buffered until a full line is available.
#[derive(Default)]
struct ChatStreamParser {
    buf: Vec<u8>,
    done: bool,
}

impl ChatStreamParser {
    /// Feeds one network chunk, returning any complete non-empty fragments.
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(chunk);
        let mut fragments = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.done {
                continue;
            }
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload == "[DONE]" {
                self.done = true;
                continue;
            }
            let json: serde_json::Value = serde_json::from_str(payload)
                .with_context(|| format!("Invalid LLM stream chunk: {}", payload))?;
            if let Some(err) = json.get("error") {
                bail!("LLM stream error: {}", err);
            }
            let delta = json
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("delta"))
                .and_then(|d| d.get("content"))
                .and_then(|c| c.as_str())
                .unwrap_or_default();
            if !delta.is_empty() {
                fragments.push(delta.to_string());
            }
        }

        Ok(fragments)
    }

    /// Parses a final line left unterminated when the body ended.
    fn flush(&mut self) -> Result<Vec<String>> {
        if self.buf.is_empty() {
            return Ok(Vec::new());
        }
        self.push(b"\n")
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

/// Create the [`LanguageModel`] selected by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown provider names or if the backend cannot be
/// initialized (missing model or API key).
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "openai" | "groq" | "ollama" => Ok(Arc::new(OpenAiCompatibleModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_whole_response() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "hi there" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "hi there");
        assert!(parse_chat_response(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn stream_parser_handles_split_lines() {
        let mut parser = ChatStreamParser::default();
        let a = parser
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel")
            .unwrap();
        assert!(a.is_empty());
        let b = parser
            .push(b"lo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n")
            .unwrap();
        assert_eq!(b, vec!["Hello".to_string(), " world".to_string()]);
        assert!(!parser.is_done());
    }

    #[test]
    fn stream_parser_stops_at_done() {
        let mut parser = ChatStreamParser::default();
        let out = parser
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n")
            .unwrap();
        assert_eq!(out, vec!["a".to_string()]);
        assert!(parser.is_done());
    }

    #[test]
    fn stream_parser_skips_role_only_and_comments() {
        let mut parser = ChatStreamParser::default();
        let out = parser
            .push(b": keep-alive\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n")
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn stream_parser_keeps_multibyte_split() {
        let mut parser = ChatStreamParser::default();
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"é\"}}]}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(parser.push(&line[..split]).unwrap().is_empty());
        assert_eq!(parser.push(&line[split..]).unwrap(), vec!["é".to_string()]);
    }

    #[test]
    fn stream_parser_flushes_unterminated_last_line() {
        let mut parser = ChatStreamParser::default();
        let out = parser
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}")
            .unwrap();
        assert_eq!(out, vec!["a".to_string()]);
        assert_eq!(parser.flush().unwrap(), vec!["tail".to_string()]);
        assert!(parser.flush().unwrap().is_empty());
    }

    #[test]
    fn stream_parser_surfaces_errors() {
        let mut parser = ChatStreamParser::default();
        assert!(parser
            .push(b"data: {\"error\":{\"message\":\"rate limited\"}}\n")
            .is_err());
        assert!(parser.push(b"data: not json\n").is_err());
    }

    #[tokio::test]
    async fn disabled_model_fails() {
        let model = DisabledModel;
        assert!(model.complete(&[]).await.is_err());
        assert!(model.stream(&[]).await.is_err());
    }

    #[test]
    fn create_model_dispatch() {
        let cfg = LlmConfig::default();
        assert_eq!(create_model(&cfg).unwrap().model_name(), "disabled");

        let cfg = LlmConfig {
            provider: "ollama".into(),
            model: Some("llama3.2".into()),
            ..LlmConfig::default()
        };
        assert_eq!(create_model(&cfg).unwrap().model_name(), "llama3.2");

        let cfg = LlmConfig {
            provider: "nope".into(),
            ..LlmConfig::default()
        };
        assert!(create_model(&cfg).is_err());
    }
}
