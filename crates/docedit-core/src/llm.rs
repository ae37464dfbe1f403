//! Language model trait.
//!
//! Defines the [`LanguageModel`] capability the pipeline depends on: turn a
//! message sequence into text, either all at once or as a stream of
//! fragments whose concatenation is the same text.
//!
//! Concrete backends (OpenAI-compatible HTTP, disabled) live in the
//! `docedit` app crate; tests supply scripted doubles.

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

use crate::models::Message;

/// Lazy, finite sequence of generated text fragments.
///
/// Dropping the stream abandons the underlying request.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A generative text capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"llama-3.3-70b-versatile"`).
    fn model_name(&self) -> &str;

    /// Produces the whole response for `messages`.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Produces the response for `messages` incrementally.
    async fn stream(&self, messages: &[Message]) -> Result<TokenStream>;
}

/// Wraps already-known fragments as a [`TokenStream`].
pub fn fragments_stream(fragments: Vec<String>) -> TokenStream {
    Box::pin(futures::stream::iter(fragments.into_iter().map(Ok)))
}
