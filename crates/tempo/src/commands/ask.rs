//! Ask command - run one paced turn headlessly.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use console::Style;
use serde_json::json;
use tempo_engine::{ChatEngine, EngineConfig, Notice, ScriptedResponder, cited_sources};
use tempo_types::{Id, Message, MessageStatus, StepStatus};

use super::Context;

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    #[arg(required = true)]
    pub prompt: String,

    /// Attach a file name (routes the question to document analysis)
    #[arg(short, long = "attach")]
    pub attachments: Vec<String>,

    /// Print the finished turn as JSON instead of streaming it
    #[arg(long)]
    pub json: bool,

    /// Fix the random phase and chunk timings
    #[arg(long)]
    pub seed: Option<u64>,

    /// Make the response fail after this many characters
    #[arg(long, value_name = "CHARS")]
    pub fail_after: Option<usize>,
}

/// Run the ask command.
pub async fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let mut config = EngineConfig::from(&loaded.config);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let mut responder = ScriptedResponder::new(config.feed.clone());
    if let Some(seed) = config.seed {
        responder = responder.with_seed(seed);
    }
    if let Some(chars) = args.fail_after {
        responder = responder.with_failure_after(chars);
    }
    let mut engine = ChatEngine::new(config, Box::new(responder));

    let dim = Style::new().dim();
    if ctx.verbose && !args.json {
        for path in loaded.loaded_from() {
            println!("{}", dim.apply_to(format!("Config: {}", path.display())));
        }
    }

    let message_id = engine.send(&args.prompt, &args.attachments)?;
    let mut category = None;
    let mut printed = 0;

    while engine.is_streaming() {
        engine.step().await;

        for notice in engine.drain_notices() {
            match notice {
                Notice::TurnStarted { category: c, .. } => category = Some(c),
                Notice::StepChanged { label, status, .. } if !args.json => {
                    let marker = match status {
                        StepStatus::InProgress => "…",
                        StepStatus::Completed => "✓",
                        StepStatus::Pending => continue,
                    };
                    println!("{}", dim.apply_to(format!("[{marker} {label}]")));
                }
                _ => {}
            }
        }

        if !args.json {
            let shown = revealed(&engine, message_id);
            if let Some(new) = shown.get(printed..)
                && !new.is_empty()
            {
                print!("{new}");
                std::io::stdout().flush()?;
                printed = shown.len();
            }
        }
    }

    let message = engine
        .selected_conversation()
        .and_then(|c| c.message(message_id))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Response message disappeared"))?;

    if args.json {
        let sources: Vec<_> = cited_sources(message.content(), message.sources());
        let output = json!({
            "prompt": args.prompt,
            "category": category,
            "message": message,
            "cited_sources": sources,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if printed > 0 {
            println!();
        }
        print_sources(&message, &dim);
    }

    if message.status() == MessageStatus::Error {
        let reason = message.error().unwrap_or("unknown error");
        anyhow::bail!("Response failed: {reason}");
    }
    Ok(())
}

/// Text revealed so far for `message_id`.
fn revealed(engine: &ChatEngine, message_id: Id) -> String {
    engine
        .selected_conversation()
        .and_then(|c| c.message(message_id))
        .map(|m| engine.view(m).display_text.to_string())
        .unwrap_or_default()
}

fn print_sources(message: &Message, dim: &Style) {
    let sources = cited_sources(message.content(), message.sources());
    if sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for source in sources {
        println!(
            "  [{}] {} {}",
            source.id,
            source.title,
            dim.apply_to(format!("({})", source.reference))
        );
    }
}
