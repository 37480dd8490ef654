//! CLI layer for cloudru-assist.
//!
//! Provides the command-line interface using clap, with commands for
//! validating credentials and chatting with the agent.

pub mod commands;
pub mod parser;

pub use commands::execute;
pub use parser::{ChatArgs, Cli, Commands, OutputFormat};
