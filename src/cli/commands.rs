//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

// Interactive mode answers as it reads, so it writes to stdout directly.
#![allow(clippy::print_stdout)]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context as _, Result, bail};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::chat_log::{ChatLog, InMemoryChatLog};
use crate::agent::client::{create_provider, validate_credentials};
use crate::agent::config::{CLOUD_RU, ConversationOptions, EntryConfig};
use crate::agent::executor::StaticToolApi;
use crate::agent::message::{ConversationInput, ConversationResult};
use crate::agent::tool::ToolDescriptor;
use crate::agent::traits::{ConversationAgent, ConversationEntity};
use crate::cli::parser::{ChatArgs, Cli, Commands, OutputFormat};
use crate::entry::{InMemoryRegistry, register_agent, setup_entry};

/// Entry id used for the CLI's single agent.
const CLI_ENTRY_ID: &str = "cli";
/// Tool API id of the demo tools.
const DEMO_API_ID: &str = "demo";

/// Executes the CLI command.
///
/// # Returns
///
/// Output to print on success. Interactive chat prints as it goes and
/// returns an empty string.
///
/// # Errors
///
/// Returns an error if the credentials are missing or rejected, or a turn
/// fails in one-shot mode.
pub async fn execute(cli: &Cli) -> Result<String> {
    let entry = entry_from_cli(cli)?;

    match &cli.command {
        Commands::Validate => cmd_validate(&entry, cli.format).await,
        Commands::Chat(args) => cmd_chat(entry, args, cli.format).await,
    }
}

fn entry_from_cli(cli: &Cli) -> Result<EntryConfig> {
    let Some(api_key) = cli.api_key.as_deref().filter(|k| !k.is_empty()) else {
        bail!("API key is required (--api-key or CLOUDRU_API_KEY)");
    };
    let Some(project_id) = cli.project_id.as_deref().filter(|p| !p.is_empty()) else {
        bail!("project id is required (--project-id or CLOUDRU_PROJECT_ID)");
    };

    let mut entry = EntryConfig::new(CLI_ENTRY_ID, api_key, project_id);
    entry.base_url.clone_from(&cli.base_url);
    Ok(entry)
}

async fn cmd_validate(entry: &EntryConfig, format: OutputFormat) -> Result<String> {
    let outcome = validate_credentials(entry, &CLOUD_RU).await;
    let base = entry.api_base(&CLOUD_RU);

    match (outcome, format) {
        (Ok(()), OutputFormat::Text) => Ok(format!("Credentials accepted by {base}")),
        (Ok(()), OutputFormat::Json) => Ok(json!({"valid": true, "base_url": base}).to_string()),
        (Err(e), _) if e.is_retryable() => Err(e).context("service not reachable, try again later"),
        (Err(e), _) => Err(e).context("credential check failed"),
    }
}

fn options_from_args(args: &ChatArgs) -> ConversationOptions {
    let mut builder = ConversationOptions::builder();
    if let Some(model) = &args.model {
        builder = builder.chat_model(model);
    }
    if let Some(prompt) = &args.prompt {
        builder = builder.prompt(prompt);
    }
    if args.bypass_default_prompt {
        builder = builder.bypass_default_prompt(true);
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(p) = args.top_p {
        builder = builder.top_p(p);
    }
    if args.thinking {
        builder = builder.thinking_mode(true);
    }
    if args.demo_tools {
        builder = builder.llm_api(DEMO_API_ID);
    }
    builder.from_env().build()
}

/// Local tools for trying out tool calls without a host.
fn demo_tools() -> StaticToolApi {
    StaticToolApi::new(DEMO_API_ID)
        .with_prompt("You can read the current time with the GetCurrentTime tool.")
        .with_tool(
            ToolDescriptor::new(
                "GetCurrentTime",
                "Returns the current Unix time in seconds",
                Value::Null,
            ),
            |_| {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e| e.to_string())?;
                Ok(json!({"unix_time": now.as_secs()}))
            },
        )
        .with_tool(
            ToolDescriptor::new(
                "Echo",
                "Repeats the given text",
                json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
            ),
            |args| {
                args.get("text")
                    .cloned()
                    .map(|text| json!({"text": text}))
                    .ok_or_else(|| "text is required".to_string())
            },
        )
}

fn new_conversation_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    format!("cli-{}-{nanos:x}", std::process::id())
}

fn render(result: &ConversationResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(result.response.speech.clone()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("JSON serialization failed")
        }
    }
}

async fn cmd_chat(mut entry: EntryConfig, args: &ChatArgs, format: OutputFormat) -> Result<String> {
    if !args.interactive && args.text.is_none() {
        bail!("nothing to say: pass TEXT or --interactive");
    }

    entry.options = options_from_args(args);
    let registry = InMemoryRegistry::new();
    let agent = if args.no_validate {
        let provider = create_provider(&entry, &CLOUD_RU)?;
        register_agent(&entry, &CLOUD_RU, provider, &registry).await
    } else {
        setup_entry(&entry, &CLOUD_RU, &registry)
            .await
            .context("entry setup failed")?
    };

    let mut chat_log = InMemoryChatLog::new(new_conversation_id());
    if args.demo_tools {
        chat_log = chat_log.with_api(Arc::new(demo_tools()));
    }

    if args.interactive {
        run_interactive(&agent, &mut chat_log, args, format).await?;
        return Ok(String::new());
    }

    let text = args.text.clone().unwrap_or_default();
    let result = turn(&agent, &mut chat_log, &text, &args.language).await?;
    render(&result, format)
}

async fn turn(
    agent: &ConversationAgent,
    chat_log: &mut InMemoryChatLog,
    text: &str,
    language: &str,
) -> Result<ConversationResult> {
    let input = input_for(chat_log, text, language);
    Ok(agent.handle_message(&input, chat_log).await?)
}

async fn run_interactive(
    agent: &ConversationAgent,
    chat_log: &mut InMemoryChatLog,
    args: &ChatArgs,
    format: OutputFormat,
) -> Result<()> {
    if let Some(text) = args.text.as_deref() {
        let result = agent.converse(&input_for(chat_log, text, &args.language), chat_log).await;
        println!("{}", render(&result, format)?);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }
        let result = agent.converse(&input_for(chat_log, text, &args.language), chat_log).await;
        println!("{}", render(&result, format)?);
    }
    Ok(())
}

fn input_for(chat_log: &InMemoryChatLog, text: &str, language: &str) -> ConversationInput {
    let mut input = ConversationInput::new(text, language, CLI_ENTRY_ID);
    input.conversation_id = Some(chat_log.conversation_id().to_string());
    input
}
