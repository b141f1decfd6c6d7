//! Toolscan - discover the tools an MCP server exposes over SSE
//!
//! Main entry point for the Toolscan CLI.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use toolscan_mcp::{ClientConfig, DEFAULT_CLIENT_NAME, McpClient, deadline_token, fetch_tools_response};

mod output;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Toolscan - discover the tools an MCP server exposes over SSE
#[derive(Parser, Debug)]
#[command(name = "toolscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL for the MCP endpoint, e.g. http://localhost:8080
    #[arg(long, env = "TOOLSCAN_URL")]
    pub url: String,

    /// Timeout in seconds for the whole fetch
    #[arg(long, default_value = "5", env = "TOOLSCAN_TIMEOUT")]
    pub timeout: u64,

    /// Client name announced to the server
    #[arg(long, default_value = DEFAULT_CLIENT_NAME)]
    pub client_name: String,

    /// HTTP header in KEY=VALUE format (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// How to print the fetched tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The tools/list response exactly as received
    Raw,
    /// One line per tool
    Table,
    /// Normalized tool list as JSON
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing(&cli);

    let mut config = ClientConfig::new(&cli.url).with_client_name(&cli.client_name);
    for (key, value) in parse_headers(&cli.headers)? {
        config = config.with_header(key, value);
    }

    let client = McpClient::new(config).context("Invalid server configuration")?;
    let ctx = deadline_token(Duration::from_secs(cli.timeout));

    let result = fetch_tools_response(&ctx, &client).await;
    ctx.cancel();
    client.close().await;
    let raw = result.context("Failed to fetch tools")?;

    output::print_tools(&raw, cli.format)
}

/// Initialize tracing: human-readable on stderr, optional JSON file.
fn init_tracing(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = if cli.verbose {
        "toolscan=debug,toolscan_mcp=debug,info"
    } else {
        "toolscan=info,toolscan_mcp=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "toolscan.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("toolscan=trace,toolscan_mcp=trace,info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}

/// Parse `KEY=VALUE` header arguments.
fn parse_headers(headers: &[String]) -> Result<Vec<(String, String)>> {
    headers
        .iter()
        .map(|header| match header.split_once('=') {
            Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
            None => Err(anyhow::anyhow!(
                "Invalid header format: '{}'. Use KEY=VALUE.",
                header
            )),
        })
        .collect()
}
