//! Efesto CLI
//!
//! Command-line client for Efesto-connected pellet heaters. One command per
//! invocation; the authenticated session is persisted between runs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use efestoctl::cli::{handle_command, Cli};
use efestoctl::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build configuration using priority chain: defaults → file → env → CLI args
    let mut builder = CliConfig::builder();

    if let Some(ref path) = cli.config {
        builder = builder.with_config_file_at(&PathBuf::from(path))?;
    } else {
        builder = builder.with_config_file(!cli.no_config)?;
    }

    builder = builder.with_env_overrides();

    // CLI argument overrides (highest priority)
    if let Some(ref server) = cli.server {
        builder = builder.with_server_url(server)?;
    }
    if let Some(verbose) = cli.verbose {
        builder = builder.with_verbose(verbose);
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let code = match handle_command(config, &cli.command, cli.argument.as_deref()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    std::process::exit(code);
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
