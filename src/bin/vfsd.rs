//! The VFS daemon binary. Serves exactly one client over stdio; logs go to
//! stderr so stdout stays a clean protocol channel.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use llmbox::server::admission::Allowlist;
use llmbox::server::{serve, ServerConfig};

/// Sandboxed virtual filesystem daemon.
///
/// Accepts only the two allowlist flags; paths are canonicalized on receipt
/// and immutable afterwards.
#[derive(Parser)]
#[command(name = "vfsd", version)]
struct Cli {
    /// Readable allowlist entry; may be repeated.
    #[arg(short = 'i', value_name = "PATH")]
    input: Vec<PathBuf>,

    /// Writable allowlist entry; may be repeated.
    #[arg(short = 'o', value_name = "PATH")]
    output: Vec<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let allowlist = if cli.input.is_empty() && cli.output.is_empty() {
        None
    } else {
        Some(Allowlist::new(cli.input, cli.output).context("canonicalize allowlist")?)
    };

    let config = ServerConfig { allowlist, ..ServerConfig::default() };
    serve(tokio::io::stdin(), tokio::io::stdout(), config).await.context("serve")?;
    Ok(())
}
