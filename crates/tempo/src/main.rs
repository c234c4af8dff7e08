//! Tempo - paced streaming for assistant responses
//!
//! Main entry point for the Tempo CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tempo_tui::{LogBuffer, TuiLogLayer};
use tracing::Level;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{ask, config, tui};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tempo - paced streaming for assistant responses
#[derive(Parser)]
#[command(name = "tempo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read configuration from this file instead of discovering it
    #[arg(long, global = true, env = "TEMPO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive terminal UI
    Tui(tui::TuiArgs),

    /// Run one paced turn and print it
    Ask(ask::AskArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_tui = matches!(cli.command, Commands::Tui(_));

    let filter = if cli.verbose {
        "tempo=debug,tempo_engine=debug,tempo_config=debug,tempo_tui=debug,info"
    } else {
        "tempo=info,tempo_engine=info,tempo_tui=info,warn"
    };

    let log_dir = tempo_config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tempo.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // The TUI owns the screen, so console output goes to its log panel instead.
    let log_buffer = LogBuffer::new();
    let console_layer = (!is_tui).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(tracing_subscriber::EnvFilter::new(filter))
    });
    let tui_layer = is_tui.then(|| {
        let min_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        TuiLogLayer::new(log_buffer.clone())
            .with_min_level(min_level)
            .with_filter(tracing_subscriber::EnvFilter::new(filter))
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(tui_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "tempo=trace,tempo_engine=trace,tempo_config=trace,tempo_tui=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        verbose: cli.verbose,
        config_file: cli.config,
        log_buffer,
    };

    match cli.command {
        Commands::Tui(args) => tui::run(args, &ctx).await,
        Commands::Ask(args) => ask::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
