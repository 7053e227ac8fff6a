//! raggate server
//!
//! OpenAI-compatible chat gateway with RAG retrieval, web search tool calls
//! and SSE streaming, fronting a `{code, data, msg}` envelope provider.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use raggate_core::Config;

mod error;
mod routes;
mod server;
mod state;

#[derive(Parser)]
#[command(name = "raggate")]
#[command(
    author,
    version,
    about = "OpenAI-compatible chat gateway with RAG and web search"
)]
struct Cli {
    /// Path to the YAML config file (defaults to the per-user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host from the config
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port from the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    server::Server::new(config)?.start().await
}
