//! Strictly Reveal - Unified CLI
//!
//! Plays, replays and inspects the bundled games from the command line.

#![warn(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use strictly_reveal::{Delta, Engine, EngineConfig};
use strictly_reveal_games::cli::{Cli, Command, parse_json_arg};
use strictly_reveal_games::{AnyGame, demo};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays pipeable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    info!(verify_consistency = config.verify_consistency(), "Engine configured");

    match cli.command {
        Command::Init { game } => print_json(&AnyGame::new(game, None).initial_state()),
        Command::Play {
            game,
            state,
            action,
            seed,
        } => {
            let engine = Engine::with_config(AnyGame::new(game, seed), config);
            let played = engine.play(&parse_json_arg(&state)?, &parse_json_arg(&action)?)?;
            print_json(&played)
        }
        Command::Replay {
            game,
            view,
            action,
            deltas,
        } => {
            let engine = Engine::with_config(AnyGame::new(game, None), config);
            let deltas: Vec<Delta> = serde_json::from_value(parse_json_arg(&deltas)?)
                .context("Deltas must be a JSON array of edit lists")?;
            let view = engine.replay(&parse_json_arg(&view)?, &parse_json_arg(&action)?, &deltas)?;
            print_json(&view)
        }
        Command::View {
            game,
            state,
            filter,
        } => {
            let engine = Engine::with_config(AnyGame::new(game, None), config);
            print_json(&engine.filter(&parse_json_arg(&state)?, filter.as_deref())?)
        }
        Command::Demo { game, turns, seed } => run_demo(AnyGame::new(game, seed), config, turns),
    }
}

/// Self-play a game and print the final state with every observer's view
#[instrument(skip(game, config))]
fn run_demo(game: AnyGame, config: EngineConfig, turns: usize) -> Result<()> {
    let session = demo::run(game, config, turns)?;
    let actions: Vec<_> = session.history().iter().map(|turn| &turn.action).collect();
    info!(actions = actions.len(), "Demo finished");
    print_json(&json!({
        "session": session.id(),
        "actions": actions,
        "state": session.state(),
        "views": session.views(),
    }))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
