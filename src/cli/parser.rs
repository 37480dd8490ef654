//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};

/// cloudru-assist: talk to Cloud.ru Foundation Models as a home assistant.
///
/// Validates credentials and runs conversation turns through the same
/// agent a host platform would use.
#[derive(Parser, Debug)]
#[command(name = "cloudru-assist")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// API key sent as `x-api-key`.
    #[arg(long, env = "CLOUDRU_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Project identifier sent as `x-project-id`.
    #[arg(long, env = "CLOUDRU_PROJECT_ID", global = true)]
    pub project_id: Option<String>,

    /// Override the API base URI.
    #[arg(long, env = "CLOUDRU_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the credentials by listing models.
    ///
    /// Exits non-zero if the key is rejected or the service is unreachable.
    #[command(after_help = r"Examples:
  cloudru-assist validate
  cloudru-assist --api-key KEY --project-id PROJECT validate
")]
    Validate,

    /// Run a conversation turn.
    #[command(after_help = r#"Examples:
  cloudru-assist chat "Какая погода?"                  # One turn
  cloudru-assist chat --interactive                    # Read utterances from stdin
  cloudru-assist chat --demo-tools "Который час?"      # Offer local demo tools
  cloudru-assist --format json chat "Привет" | jq .response.speech
"#)]
    Chat(ChatArgs),
}

/// Arguments for the `chat` command.
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Utterance to send. Required unless `--interactive`.
    pub text: Option<String>,

    /// Keep one conversation going, reading utterances from stdin.
    #[arg(short, long)]
    pub interactive: bool,

    /// Utterance language.
    #[arg(short, long, default_value = "ru")]
    pub language: String,

    /// Chat model.
    #[arg(short, long, env = "CLOUDRU_CHAT_MODEL")]
    pub model: Option<String>,

    /// Instructions prompt.
    #[arg(long, env = "CLOUDRU_PROMPT")]
    pub prompt: Option<String>,

    /// Render the prompt as a template and send it verbatim.
    #[arg(long)]
    pub bypass_default_prompt: bool,

    /// Maximum completion tokens.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability.
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Let the model emit a reasoning block.
    #[arg(long)]
    pub thinking: bool,

    /// Offer a small set of local tools to the model.
    #[arg(long)]
    pub demo_tools: bool,

    /// Skip the credential check before the first turn.
    #[arg(long)]
    pub no_validate: bool,
}
