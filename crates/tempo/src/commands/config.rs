//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use tempo_config::TempoConfig;

use super::Context;

/// Project-local config file created by `config init --local`.
const LOCAL_CONFIG_FILE: &str = "tempo.toml";

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Show the user configuration file path
    Path,

    /// Write a config file filled with the defaults
    Init {
        /// Create project-local config (./tempo.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    println!("# Tempo Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)");
    } else {
        for source in &sources {
            println!("# Loaded: {}", source.display());
        }
    }
    for warning in &loaded.warnings {
        println!("# Warning: {warning}");
    }
    println!();

    let mut resolved = TempoConfig::with_defaults();
    resolved.merge(loaded.config);
    print!("{}", resolved.to_toml()?);
    Ok(())
}

fn cmd_path() -> Result<()> {
    match tempo_config::user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(LOCAL_CONFIG_FILE)
    } else {
        tempo_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    tempo_config::write_config(&TempoConfig::with_defaults(), &path)?;
    println!("Created {}", path.display());
    Ok(())
}
