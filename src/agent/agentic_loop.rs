//! Bounded model ↔ tool loop for one conversation turn.
//!
//! Each iteration streams one model response into the chat log. The log
//! runs any requested tools; if it ends with a tool result the model has not
//! seen, the loop asks the model again with the extended history.

use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionTool};
use tracing::{debug, error};

use super::chat_log::ChatLog;
use super::codec::encode;
use super::config::ConversationOptions;
use super::provider::LlmProvider;
use super::request::TurnRequest;
use super::stream::transform_stream;
use crate::error::ConverseError;

/// Runs the loop until no tool result is left unanswered or
/// `max_iterations` requests have been made.
///
/// `messages` is the encoded history and grows with every item the chat log
/// appends. Returns the number of requests made.
///
/// Running out of iterations is not an error here; the caller decides
/// based on the final state of the chat log.
///
/// # Errors
///
/// Returns [`ConverseError::RateLimited`] or [`ConverseError::Api`] for
/// provider failures and propagates stream decoding errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    chat_log: &mut dyn ChatLog,
    options: &ConversationOptions,
    tools: Option<&[ChatCompletionTool]>,
    agent_id: &str,
    messages: &mut Vec<ChatCompletionRequestMessage>,
    max_iterations: usize,
) -> Result<usize, ConverseError> {
    for iteration in 0..max_iterations {
        let request = TurnRequest::new(
            options,
            messages.clone(),
            tools.map(<[ChatCompletionTool]>::to_vec),
            chat_log.conversation_id(),
        );

        debug!(
            iteration,
            provider = provider.name(),
            messages = messages.len(),
            "requesting model response"
        );
        let chunks = provider.chat_stream(&request).await?;
        let added = chat_log
            .add_delta_content_stream(agent_id, transform_stream(chunks))
            .await
            .inspect_err(|e| error!(iteration, error = %e, "response stream failed"))?;

        messages.extend(added.iter().map(|content| encode(content, None)));

        if !chat_log.unresponded_tool_results() {
            debug!(iteration, added = added.len(), "turn complete");
            return Ok(iteration + 1);
        }
        debug!(iteration, added = added.len(), "tool results pending, continuing");
    }

    debug!(max_iterations, "iteration limit reached");
    Ok(max_iterations)
}
