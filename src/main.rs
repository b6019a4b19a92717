use anyhow::Result;
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use std::path::PathBuf;
use tracing_subscriber::{self, filter::EnvFilter};

use ast_grep_cli_mcp::{
    ast_grep_service::AstGrepService,
    config::{ServiceConfig, default_install_directory},
};

/// ast-grep CLI MCP Server - structural search, rewrites, and rule scans
/// through the ast-grep binary
#[derive(Parser, Debug)]
#[command(name = "ast-grep-cli-mcp")]
#[command(about = "Model Context Protocol server bridging the ast-grep CLI")]
#[command(version)]
struct Args {
    /// Root directories requests may touch (can be specified multiple times)
    #[arg(
        short = 'd',
        long = "root-dir",
        help = "Root directory requests may touch (default: current directory)",
        value_name = "PATH"
    )]
    root_directories: Vec<PathBuf>,

    /// Explicit path to the ast-grep binary
    #[arg(
        long = "binary-path",
        help = "ast-grep binary to use, bypassing discovery and download",
        value_name = "PATH"
    )]
    binary_path: Option<PathBuf>,

    /// Directory for a managed ast-grep installation
    #[arg(
        long = "install-dir",
        help = "Directory for a downloaded ast-grep binary (default: ~/.ast-grep-mcp/bin)",
        value_name = "PATH"
    )]
    install_directory: Option<PathBuf>,

    /// Never download the ast-grep binary
    #[arg(
        long = "no-download",
        help = "Disable the binary download step of discovery"
    )]
    no_download: bool,

    /// Per-call subprocess timeout
    #[arg(
        long = "timeout-secs",
        default_value = "30",
        help = "Timeout for each ast-grep invocation in seconds"
    )]
    timeout_secs: u64,

    /// Cap on captured subprocess output
    #[arg(
        long = "max-output-bytes",
        default_value = "16777216", // 16MiB
        help = "Maximum bytes of ast-grep output captured per call"
    )]
    max_output_bytes: usize,

    /// Maximum file size the regex fallback will read (in bytes)
    #[arg(
        long = "max-file-size",
        default_value = "52428800", // 50MB
        help = "Maximum file size the regex fallback search will read"
    )]
    max_file_size: u64,
}

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize the tracing subscriber with stderr logging (stdout carries MCP)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting MCP server with config: {:?}", args);

    // Create a custom config from command line arguments
    let config = create_config_from_args(args)?;

    // Create an instance of our ast-grep service with custom config
    let service = AstGrepService::with_config(config).serve(stdio()).await?;

    tracing::info!("Service started, waiting for connections");
    service.waiting().await?;
    Ok(())
}

/// Create a ServiceConfig from command line arguments
fn create_config_from_args(args: Args) -> Result<ServiceConfig> {
    let root_directories = if args.root_directories.is_empty() {
        // Default to current working directory
        vec![std::env::current_dir()?]
    } else {
        args.root_directories
    };

    let install_directory = args
        .install_directory
        .unwrap_or_else(default_install_directory);

    Ok(ServiceConfig {
        root_directories,
        binary_path: args.binary_path,
        install_directory,
        download_enabled: !args.no_download,
        timeout_secs: args.timeout_secs,
        max_output_bytes: args.max_output_bytes,
        max_file_size: args.max_file_size,
    })
}
