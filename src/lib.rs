//! # cloudru-assist
//!
//! Conversation agent for Cloud.ru Foundation Models, built for smart-home
//! assistant hosts.
//!
//! The agent turns a user utterance into a streamed chat completion,
//! reassembles tool calls from the stream, lets the host run them and loops
//! (at most [`MAX_TOOL_ITERATIONS`](agent::MAX_TOOL_ITERATIONS) times) until
//! the model answers in plain text.
//!
//! ## Modules
//!
//! - [`agent`]: tool formatting, message encoding, stream transformation,
//!   the conversation driver and the provider client
//! - [`entry`]: config-entry setup, unload and reload
//! - [`error`]: error types
//! - `cli`: command-line front end (feature `cli`)
//!
//! ## Example
//!
//! ```no_run
//! use cloudru_assist::agent::{ConversationInput, EntryConfig, InMemoryChatLog, CLOUD_RU};
//! use cloudru_assist::agent::ConversationEntity;
//! use cloudru_assist::entry::{setup_entry, InMemoryRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let entry = EntryConfig::from_env("living-room")?;
//! let registry = InMemoryRegistry::new();
//! let agent = setup_entry(&entry, &CLOUD_RU, &registry).await?;
//!
//! let mut chat_log = InMemoryChatLog::new("conversation-1");
//! let input = ConversationInput::new("Привет!", "ru", "living-room");
//! let result = agent.handle_message(&input, &mut chat_log).await?;
//! println!("{}", result.response.speech);
//! # Ok(())
//! # }
//! ```

pub mod agent;
#[cfg(feature = "cli")]
pub mod cli;
pub mod entry;
pub mod error;

pub use error::{ConverseError, Result, SetupError, TemplateError, ToolError};
