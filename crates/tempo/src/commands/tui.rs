//! TUI command handler.

use anyhow::Result;
use clap::Args;
use tempo_engine::EngineConfig;
use tempo_tui::TuiConfig;

use super::Context;

/// TUI command arguments.
#[derive(Args, Debug)]
pub struct TuiArgs {
    /// Fix the random phase and chunk timings
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Run the TUI.
pub async fn run(args: TuiArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let mut engine = EngineConfig::from(&loaded.config);
    if let Some(seed) = args.seed {
        engine = engine.with_seed(seed);
    }

    let config = TuiConfig::new(engine).with_log_buffer(ctx.log_buffer.clone());
    tempo_tui::run_with_config(config).await
}
