//! PDF Annotator MCP Server - Entry point

use clap::Parser;
use pdf_annotator_mcp::{run_server_with_config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pdf-annotator-mcp")]
#[command(about = "MCP server for extracting PDF annotations and highlighted text")]
struct Args {
    /// Directories the server is allowed to read PDFs from (at least one)
    #[arg(required = true)]
    directories: Vec<String>,

    /// Maximum PDF file size in bytes
    #[arg(long, default_value_t = pdf_annotator_mcp::source::DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the MCP transport, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pdf_annotator_mcp={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(directories = ?args.directories, "Starting PDF Annotator MCP Server");

    run_server_with_config(ServerConfig {
        allowed_dirs: args.directories,
        max_file_size: args.max_file_size,
    })
    .await
}
