//! `verity` binary: serve the endpoint or check a knowledge base

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use verity_corpus::Corpus;
use verity_server::{logging, router, AppState, CliOverrides, Config};

#[derive(Debug, Parser)]
#[command(name = "verity", version, about = "Grounded streaming answer endpoint")]
struct Cli {
    /// Config file (defaults to ./verity.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,

    /// Knowledge base directory
    #[arg(long, global = true)]
    corpus_dir: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Serve the WebSocket endpoint (default)
    Serve,
    /// Load the knowledge base, print its size, and exit
    CheckCorpus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::discover(&std::env::current_dir()?)?,
    };
    config.apply(CliOverrides {
        bind: cli.bind,
        corpus_dir: cli.corpus_dir,
        log_level: cli.log_level,
    });
    config.validate()?;
    logging::init(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::CheckCorpus => check_corpus(&config),
        Command::Serve => serve(config).await,
    }
}

fn check_corpus(config: &Config) -> anyhow::Result<()> {
    let corpus = Corpus::load(&config.corpus)
        .with_context(|| format!("loading {}", config.corpus.source_dir.display()))?;

    println!("Knowledge base: {}", config.corpus.source_dir.display());
    for doc in corpus.documents() {
        println!("  {} ({} bytes, {} facts)", doc.id(), doc.raw_text().len(), doc.facts().len());
    }
    println!("Documents: {}", corpus.len());
    println!("Distinct facts: {}", corpus.known_facts().len());

    if corpus.is_empty() {
        anyhow::bail!("no eligible documents in {}", config.corpus.source_dir.display());
    }
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config).context("loading knowledge base")?);

    let shutdown = CancellationToken::new();
    let sweeper = Arc::clone(&state.services().ledger)
        .spawn_sweeper(config.actions.sweep_interval(), shutdown.clone());

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!("verity {} listening on {}", verity_server::VERSION, config.server.bind);

    let signal = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown requested"),
                Err(e) => {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
            signal.cancel();
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    sweeper.await?;
    tracing::info!("Stopped");
    Ok(())
}
