//! cloudru-assist binary entry point.

use anyhow::Result;
use clap::Parser;
use cloudru_assist::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

#[tokio::main]
#[allow(clippy::print_stdout)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warnings only, or debug with --verbose.
    let default_filter = if cli.verbose { "cloudru_assist=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = execute(&cli).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
