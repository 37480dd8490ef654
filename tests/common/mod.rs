//! Shared fixtures for integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::ResponseTemplate;

/// Wraps a chunk's `choices` in a full chat-completion chunk.
pub fn chunk(choices: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "MiniMaxAI/MiniMax-M2",
        "choices": choices,
    })
}

/// Encodes chunks as a server-sent-events body terminated by `[DONE]`.
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(&chunk.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// A 200 response streaming the given chunks.
pub fn sse_response(chunks: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(chunks), "text/event-stream")
}

/// Role marker, text fragments, then a `stop` finish.
pub fn text_chunks(fragments: &[&str]) -> Vec<Value> {
    let mut chunks = vec![chunk(json!([{"index": 0, "delta": {"role": "assistant"}}]))];
    for fragment in fragments {
        chunks.push(chunk(json!([{"index": 0, "delta": {"content": fragment}}])));
    }
    chunks.push(chunk(json!([{"index": 0, "delta": {}, "finish_reason": "stop"}])));
    chunks
}

/// A tool call whose arguments arrive in the given pieces.
pub fn tool_chunks(id: &str, name: &str, argument_pieces: &[&str]) -> Vec<Value> {
    let mut chunks = vec![chunk(json!([{"index": 0, "delta": {"role": "assistant"}}]))];
    for (i, piece) in argument_pieces.iter().enumerate() {
        let call = if i == 0 {
            json!({"index": 0, "id": id, "type": "function", "function": {"name": name, "arguments": piece}})
        } else {
            json!({"index": 0, "function": {"arguments": piece}})
        };
        chunks.push(chunk(json!([{"index": 0, "delta": {"tool_calls": [call]}}])));
    }
    chunks.push(chunk(json!([{"index": 0, "delta": {}, "finish_reason": "tool_calls"}])));
    chunks
}

/// Body of a model listing.
pub fn models_body() -> Value {
    json!({
        "object": "list",
        "data": [
            {"id": "MiniMaxAI/MiniMax-M2", "object": "model", "created": 0, "owned_by": "cloud.ru"},
            {"id": "Qwen/Qwen3-235B-A22B-Instruct-2507", "object": "model", "created": 0, "owned_by": "cloud.ru"}
        ]
    })
}
