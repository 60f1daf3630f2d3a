//! Strictly Reveal - play/replay engine for hidden-information games
//!
//! A game is a transition function over an authoritative JSON state plus
//! filters that project that state down to what each observer may see. The
//! engine runs the transition in two modes:
//!
//! - **Play** (authoritative): applies an action to the full state and
//!   records, for every filter, the minimal delta each observer is entitled
//!   to learn from the action's reveals.
//! - **Replay** (observer): reconstructs an observer's new view from their
//!   prior view, the same action, and their recorded deltas, without access
//!   to hidden state.
//!
//! # Architecture
//!
//! - **Delta**: structural diff/patch codec over `serde_json::Value`
//! - **Filter**: per-observer projections, resolved once per invocation
//! - **Ledger**: [`Draft::reveal`], the only place randomness and hidden
//!   reads may influence a transition
//! - **Engine**: [`Engine::play`], [`Engine::replay`], [`Engine::filter`]
//! - **Verify**: in debug builds, every play is replayed per filter and
//!   checked against the authoritative result
//!
//! # Example
//!
//! ```
//! use serde_json::{json, Value};
//! use strictly_reveal::{Draft, Engine, EngineError, GameDefinition, Transition};
//!
//! struct Adding;
//!
//! impl GameDefinition for Adding {
//!     fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
//!         let total = draft["total"].as_i64().unwrap_or(0) + action.as_i64().unwrap_or(0);
//!         draft["total"] = json!(total);
//!         Ok(Transition::InPlace)
//!     }
//! }
//!
//! let engine = Engine::new(Adding);
//! let played = engine.play(&json!({"total": 4}), &json!(3)).unwrap();
//! assert_eq!(played.state(), &json!({"total": 7}));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod delta;
mod engine;
mod error;
mod filter;
mod game;
mod ledger;
mod verify;

// Crate-level exports - Delta codec
pub use delta::{Delta, Edit, PatchError, PathSegment, diff, patch};

// Crate-level exports - Engine
pub use engine::{Engine, Played};

// Crate-level exports - Game definition
pub use game::{GameDefinition, Transition};
pub use ledger::{Draft, Mode};

// Crate-level exports - Filters
pub use filter::{DEFAULT_FILTER_KEY, Filter, FilterMode, Filters, ResolvedFilters, resolve};

// Crate-level exports - Configuration
pub use config::{ConfigError, EngineConfig};

// Crate-level exports - Errors
pub use error::{ConsistencyViolation, EngineError, GameError};
