//! Command-line interface for strictly_reveal.

use crate::games::GameKind;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Strictly Reveal - play and replay hidden-information games
#[derive(Parser, Debug)]
#[command(name = "strictly_reveal")]
#[command(about = "Play/replay engine for hidden-information games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
///
/// JSON arguments are given inline or as `@path` to read them from a file.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a game's starting state
    Init {
        /// Game to set up
        #[arg(short, long, value_enum)]
        game: GameKind,
    },

    /// Apply an action to the authoritative state and print state plus deltas
    Play {
        /// Game being played
        #[arg(short, long, value_enum)]
        game: GameKind,

        /// Authoritative state
        #[arg(long)]
        state: String,

        /// Action to apply
        #[arg(long)]
        action: String,

        /// RNG seed for reveals
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Rebuild an observer's view from their prior view and recorded deltas
    Replay {
        /// Game being played
        #[arg(short, long, value_enum)]
        game: GameKind,

        /// Observer's view before the action
        #[arg(long)]
        view: String,

        /// Action that was played
        #[arg(long)]
        action: String,

        /// Observer's delta sequence (JSON array)
        #[arg(long)]
        deltas: String,
    },

    /// Project a state through one of the game's filters
    View {
        /// Game being played
        #[arg(short, long, value_enum)]
        game: GameKind,

        /// Authoritative state
        #[arg(long)]
        state: String,

        /// Filter key (multi-filter games only)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Self-play a game, replaying every action for every observer
    Demo {
        /// Game to play
        #[arg(short, long, value_enum, default_value = "racers")]
        game: GameKind,

        /// Maximum number of actions
        #[arg(long, default_value = "12")]
        turns: usize,

        /// RNG seed for reveals
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Parses a JSON argument given inline or as `@path`.
#[instrument]
pub fn parse_json_arg(arg: &str) -> Result<Value> {
    match arg.strip_prefix('@') {
        Some(path) => {
            debug!(path, "Reading JSON argument from file");
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path))
        }
        None => serde_json::from_str(arg).context("Invalid inline JSON argument"),
    }
}
