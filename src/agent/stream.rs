//! Chat-completion stream → assistant content deltas.
//!
//! [`StreamTransformer`] is a state machine fed one chunk at a time. It
//! reassembles tool calls whose arguments arrive split over many chunks and
//! turns text fragments into [`AssistantContentDelta`]s. [`transform_stream`]
//! drives it over an async chunk stream and yields a lazy, single-pass delta
//! stream.
//!
//! At most one tool call is accumulated at a time: requests are sent with
//! parallel tool calls disabled, so a fragment with a new index means the
//! previous call is complete.

use std::pin::Pin;

use async_openai::error::OpenAIError;
use async_openai::types::{ChatCompletionMessageToolCallChunk, CreateChatCompletionStreamResponse};
use futures_util::{Stream, StreamExt, stream};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::message::{AssistantContentDelta, ToolInput};
use super::providers::classify_provider_error;
use crate::error::ConverseError;

/// Chunks as produced by the chat-completion client.
pub type ChunkStream = Pin<
    Box<dyn Stream<Item = Result<CreateChatCompletionStreamResponse, OpenAIError>> + Send>,
>;

/// Deltas as consumed by the chat log.
pub type DeltaStream<'a> =
    Pin<Box<dyn Stream<Item = Result<AssistantContentDelta, ConverseError>> + Send + 'a>>;

/// A tool call being reassembled from stream fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ToolCallAccumulator {
    index: u32,
    id: String,
    tool_name: String,
    tool_args: String,
}

impl ToolCallAccumulator {
    /// Parses the accumulated arguments into a finished call.
    ///
    /// With `lenient`, an empty buffer is read as `{}`: tools without
    /// arguments may finish without sending any argument text.
    fn finish(self, lenient: bool) -> Result<ToolInput, ConverseError> {
        let raw = if lenient && self.tool_args.is_empty() {
            "{}"
        } else {
            self.tool_args.as_str()
        };

        let tool_args = serde_json::from_str::<Map<String, Value>>(raw).map_err(|source| {
            ConverseError::InvalidToolArguments {
                tool_name: self.tool_name.clone(),
                source,
            }
        })?;

        Ok(ToolInput {
            id: self.id,
            tool_name: self.tool_name,
            tool_args,
        })
    }
}

/// Result of feeding one chunk to the transformer.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Emit a delta and keep reading.
    Emit(AssistantContentDelta),
    /// Nothing to emit for this chunk.
    Skip,
    /// The response is complete; emit the final delta, if any, and stop.
    Finish(Option<AssistantContentDelta>),
}

/// State machine reassembling one streamed response.
///
/// One instance serves exactly one response stream.
#[derive(Debug, Default)]
pub struct StreamTransformer {
    current_tool_call: Option<ToolCallAccumulator>,
}

impl StreamTransformer {
    /// Creates a transformer with nothing in flight.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current_tool_call: None,
        }
    }

    /// Returns `true` while a tool call is being accumulated.
    #[must_use]
    pub const fn has_pending_tool_call(&self) -> bool {
        self.current_tool_call.is_some()
    }

    /// Feeds one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`ConverseError::Protocol`] if a tool-call chunk lacks its
    /// function payload, and [`ConverseError::InvalidToolArguments`] if a
    /// completed call's arguments are not a JSON object.
    pub fn push(&mut self, chunk: CreateChatCompletionStreamResponse) -> Result<Step, ConverseError> {
        debug!(?chunk, "received chunk");

        // An empty `choices` list also ends the response. Some models send
        // one instead of a finish reason after an argument-less tool call.
        let Some(choice) = chunk.choices.into_iter().next() else {
            return self.finish();
        };
        if choice.finish_reason.is_some() {
            return self.finish();
        }

        let delta = choice.delta;
        let tool_call = delta.tool_calls.and_then(|calls| calls.into_iter().next());

        if self.current_tool_call.is_none() && tool_call.is_none() {
            // Provider quirk: some models open with whitespace-only fragments
            // (e.g. "\n\n") that break tool usage downstream.
            // An empty string is not suppressed: streams commonly open with
            // `{"role": "assistant", "content": ""}`.
            if delta
                .content
                .as_deref()
                .is_some_and(|c| !c.is_empty() && c.trim().is_empty())
            {
                return Ok(Step::Skip);
            }
            return Ok(Step::Emit(AssistantContentDelta {
                role: delta.role.map(|role| role_name(role).to_string()),
                content: delta.content,
                tool_calls: Vec::new(),
            }));
        }

        let Some(ChatCompletionMessageToolCallChunk {
            index,
            id,
            function: Some(function),
            ..
        }) = tool_call
        else {
            return Err(ConverseError::Protocol {
                message: "expected delta with tool call".to_string(),
            });
        };

        if let Some(current) = self.current_tool_call.as_mut() {
            if current.index == index {
                current
                    .tool_args
                    .push_str(function.arguments.as_deref().unwrap_or_default());
                return Ok(Step::Skip);
            }
        }

        let previous = self.current_tool_call.replace(ToolCallAccumulator {
            index,
            id: id.unwrap_or_default(),
            tool_name: function.name.unwrap_or_default(),
            tool_args: function.arguments.unwrap_or_default(),
        });

        match previous {
            Some(previous) => Ok(Step::Emit(AssistantContentDelta::tool_call(
                previous.finish(false)?,
            ))),
            None => Ok(Step::Skip),
        }
    }

    fn finish(&mut self) -> Result<Step, ConverseError> {
        match self.current_tool_call.take() {
            Some(call) => Ok(Step::Finish(Some(AssistantContentDelta::tool_call(
                call.finish(true)?,
            )))),
            None => Ok(Step::Finish(None)),
        }
    }

    /// Called when the upstream ends without a terminal chunk.
    fn abandon(&mut self) {
        if let Some(call) = self.current_tool_call.take() {
            warn!(
                tool = call.tool_name,
                call_id = call.id,
                "stream ended without finish reason, dropping incomplete tool call"
            );
        }
    }
}

const fn role_name(role: async_openai::types::Role) -> &'static str {
    use async_openai::types::Role;
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
        Role::Function => "function",
    }
}

struct TransformState<S> {
    chunks: S,
    machine: StreamTransformer,
    done: bool,
}

/// Transforms a chunk stream into a lazy delta stream.
///
/// The returned stream ends after the terminal chunk, after the first error,
/// or when the upstream is exhausted. It is fused: polling after the end
/// keeps yielding `None`. Dropping it early is safe.
pub fn transform_stream<'a, S>(chunks: S) -> DeltaStream<'a>
where
    S: Stream<Item = Result<CreateChatCompletionStreamResponse, OpenAIError>> + Send + Unpin + 'a,
{
    let state = TransformState {
        chunks,
        machine: StreamTransformer::new(),
        done: false,
    };

    let deltas = stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            let Some(next) = state.chunks.next().await else {
                state.machine.abandon();
                return None;
            };

            let step = next
                .map_err(classify_provider_error)
                .and_then(|chunk| state.machine.push(chunk));

            match step {
                Ok(Step::Skip) => {}
                Ok(Step::Emit(delta)) => return Some((Ok(delta), state)),
                Ok(Step::Finish(Some(delta))) => {
                    state.done = true;
                    return Some((Ok(delta), state));
                }
                Ok(Step::Finish(None)) => return None,
                Err(err) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
            }
        }
    });

    Box::pin(deltas.fuse())
}
