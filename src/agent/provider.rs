//! Pluggable chat-completion backend.
//!
//! The conversation driver only needs one operation from the remote side:
//! open a chunk stream for a [`TurnRequest`]. Keeping it behind a trait lets
//! the driver run against scripted streams in tests.

use async_trait::async_trait;

use super::request::TurnRequest;
use super::stream::ChunkStream;
use crate::error::ConverseError;

/// Trait for chat-completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"cloud_ru"`).
    fn name(&self) -> &'static str;

    /// Opens a streaming chat completion.
    ///
    /// Errors that only surface once the stream is polled arrive as stream
    /// items instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConverseError::RateLimited`] or [`ConverseError::Api`] if
    /// the request is rejected up front.
    async fn chat_stream(&self, request: &TurnRequest) -> Result<ChunkStream, ConverseError>;
}
