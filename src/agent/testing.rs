//! Scripted provider and chunk builders shared by unit tests.

#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_openai::types::CreateChatCompletionStreamResponse;
use async_trait::async_trait;
use futures_util::stream;
use serde_json::{Value, json};

use super::provider::LlmProvider;
use super::request::TurnRequest;
use super::stream::ChunkStream;
use crate::error::ConverseError;

/// One scripted reply: either chunks to stream or an up-front failure.
pub type Reply = Result<Vec<CreateChatCompletionStreamResponse>, ConverseError>;

/// Provider that replays scripted replies and records every request.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider that answers every request with the same reply.
    pub fn repeating(reply: &[CreateChatCompletionStreamResponse], times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(reply.to_vec())).collect())
    }

    /// Serialized requests seen so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat_stream(&self, request: &TurnRequest) -> Result<ChunkStream, ConverseError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(serde_json::to_value(request).unwrap_or_default());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply left"));

        let chunks = reply?;
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

pub fn chunk(choices: Value) -> CreateChatCompletionStreamResponse {
    serde_json::from_value(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "created": 0,
        "model": "test",
        "choices": choices,
    }))
    .unwrap_or_else(|e| panic!("invalid chunk: {e}"))
}

/// A plain text answer: role, text, finish.
pub fn text_reply(text: &str) -> Vec<CreateChatCompletionStreamResponse> {
    vec![
        chunk(json!([{"index": 0, "delta": {"role": "assistant"}}])),
        chunk(json!([{"index": 0, "delta": {"content": text}}])),
        chunk(json!([{"index": 0, "delta": {}, "finish_reason": "stop"}])),
    ]
}

/// A single tool call answer with complete arguments.
pub fn tool_reply(id: &str, name: &str, args: &Value) -> Vec<CreateChatCompletionStreamResponse> {
    vec![
        chunk(json!([{"index": 0, "delta": {"role": "assistant"}}])),
        chunk(json!([{"index": 0, "delta": {"tool_calls": [{
            "index": 0,
            "id": id,
            "type": "function",
            "function": {"name": name, "arguments": args.to_string()}
        }]}}])),
        chunk(json!([{"index": 0, "delta": {}, "finish_reason": "tool_calls"}])),
    ]
}
