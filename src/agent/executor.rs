//! Tool API that dispatches calls to registered Rust closures.
//!
//! [`StaticToolApi`] is the simplest [`LlmApi`]: a fixed tool list with one
//! handler per tool. Hosts embed it when their tools are plain functions;
//! the CLI uses it to expose a couple of local tools.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::chat_log::LlmApi;
use super::message::ToolInput;
use super::tool::ToolDescriptor;

/// Maximum serialized size of tool arguments accepted from the model.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

type Handler = Box<dyn Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync>;

/// Tool API backed by in-process handlers.
pub struct StaticToolApi {
    id: String,
    prompt: Option<String>,
    tools: Vec<ToolDescriptor>,
    handlers: HashMap<String, Handler>,
}

impl StaticToolApi {
    /// Creates an API with no tools.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: None,
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Sets the instructions added to the system prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Registers a tool and its handler. A tool with the same name is replaced.
    #[must_use]
    pub fn with_tool<F>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.tools.retain(|t| t.name != descriptor.name);
        self.handlers
            .insert(descriptor.name.clone(), Box::new(handler));
        self.tools.push(descriptor);
        self
    }

    /// Dispatches a call to its handler.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown tools, oversized arguments or handler
    /// failures.
    pub fn execute(&self, call: &ToolInput) -> Result<Value, String> {
        let size = Value::Object(call.tool_args.clone()).to_string().len();
        if size > MAX_TOOL_ARGS_LEN {
            return Err(format!(
                "tool arguments too large ({size} bytes, max {MAX_TOOL_ARGS_LEN})"
            ));
        }

        let handler = self
            .handlers
            .get(&call.tool_name)
            .ok_or_else(|| format!("unknown tool '{}'", call.tool_name))?;
        let result = handler(&call.tool_args);
        debug!(
            tool = call.tool_name,
            call_id = call.id,
            is_error = result.is_err(),
            "tool execution complete"
        );
        result
    }
}

impl std::fmt::Debug for StaticToolApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToolApi")
            .field("id", &self.id)
            .field("tools", &self.tools.iter().map(|t| &t.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmApi for StaticToolApi {
    fn id(&self) -> &str {
        &self.id
    }

    fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    fn api_prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    async fn call_tool(&self, call: &ToolInput) -> Result<Value, String> {
        self.execute(call)
    }
}
