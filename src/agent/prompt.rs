//! Built-in system prompt and prompt-template rendering.
//!
//! When the default host prompt is bypassed, the configured prompt is
//! rendered as a template and sent verbatim as the system message.

use serde::Serialize;
use tera::{Context, Tera};

use super::message::ConversationInput;
use crate::error::TemplateError;

/// Default instructions for the assistant.
pub const DEFAULT_INSTRUCTIONS_PROMPT: &str = "Ты — голосовой ассистент для Home Assistant.
Отвечай на вопросы правдиво. Отвечай кратко, чётко и на русском языке.
";

/// Variables a prompt template can reference.
#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    language: &'a str,
    agent_id: &'a str,
    conversation_id: &'a str,
}

/// Renders a prompt template for one turn.
///
/// The template sees `language`, `agent_id` and `conversation_id`. The
/// input's extra system prompt, if any, is appended to the rendered text.
///
/// # Errors
///
/// Returns [`TemplateError`] if the template does not parse or references
/// an unknown variable. Unknown variables are rejected rather than rendered
/// as empty text; guard optional ones with `{% if x is defined %}`.
pub fn render_prompt_template(
    template: &str,
    input: &ConversationInput,
    conversation_id: &str,
) -> Result<String, TemplateError> {
    let context = Context::from_serialize(PromptContext {
        language: &input.language,
        agent_id: &input.agent_id,
        conversation_id,
    })?;

    let mut prompt = Tera::one_off(template, &context, false)?;
    if let Some(extra) = input.extra_system_prompt.as_deref() {
        prompt.push_str(extra);
    }
    Ok(prompt)
}
