// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use iris::config::Config;
use iris::context::Context;
use iris::labeler::Labeler;
use iris::server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Automatic labeling for Google Cloud resources
#[derive(Debug, Parser)]
#[command(name = "iris", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, env = "IRIS_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP front end (the default)
    Serve,
    /// Label every resource of one type in one project, then exit
    LabelAll {
        /// Plugin name, e.g. `Instances`
        #[arg(long)]
        plugin: String,
        /// Project id
        #[arg(long)]
        project: String,
    },
    /// Publish one labeling request per enabled project and scheduled plugin, then exit
    Schedule,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("iris")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn initialize_logging() {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=iris=debug iris
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json iris
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    initialize_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Iris");
    debug!(config = %args.config.display(), "Loading configuration");

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let listen_addr = config.listen_addr.clone();
    let ctx = Arc::new(Context::new(config).context("building Google API client")?);
    let labeler = Arc::new(Labeler::load(ctx)?);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            server::serve(labeler, &listen_addr).await?;
        }
        Command::LabelAll { plugin, project } => {
            let summary = labeler.label_all(&plugin, &project).await?;
            println!("{summary:#?}");
        }
        Command::Schedule => {
            let sent = labeler.schedule().await?;
            println!("Sent {sent} labeling requests");
        }
    }

    info!("Iris stopped");
    Ok(())
}
