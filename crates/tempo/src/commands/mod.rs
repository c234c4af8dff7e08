//! CLI command handlers.

pub mod ask;
pub mod config;
pub mod tui;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tempo_config::LoadedConfig;
use tempo_tui::LogBuffer;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit config file from `--config`.
    pub config_file: Option<PathBuf>,
    /// Receives tracing events while the TUI owns the terminal.
    pub log_buffer: LogBuffer,
}

impl Context {
    /// Load the explicit config file, or discover and merge the usual layers.
    ///
    /// Warnings are logged; out-of-range values have already been replaced
    /// by defaults.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = match &self.config_file {
            Some(path) => tempo_config::load_explicit(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => tempo_config::load_config(None),
        };

        for warning in &loaded.warnings {
            tracing::warn!("{warning}");
        }
        tracing::debug!(sources = ?loaded.loaded_from(), "Configuration loaded");
        Ok(loaded)
    }
}
