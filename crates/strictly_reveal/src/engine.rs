//! Play/replay executor.

use crate::config::EngineConfig;
use crate::delta::Delta;
use crate::error::EngineError;
use crate::filter::{self, DEFAULT_FILTER_KEY, FilterMode};
use crate::game::{GameDefinition, Transition};
use crate::ledger::{Draft, Ledger};
use crate::verify;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Outcome of an authoritative play.
///
/// Serializes as `{"state": .., "reveal": [..]}` for single-filter games and
/// `{"state": .., "revealByFilter": {..}}` for multi-filter games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Played {
    /// Game with one anonymous filter.
    Single {
        /// New authoritative state.
        state: Value,
        /// One delta per reveal, in call order.
        reveal: Vec<Delta>,
    },
    /// Game with keyed filters.
    Multi {
        /// New authoritative state.
        state: Value,
        /// Per-filter delta sequences.
        #[serde(rename = "revealByFilter")]
        reveal_by_filter: BTreeMap<String, Vec<Delta>>,
    },
}

impl Played {
    /// New authoritative state.
    pub fn state(&self) -> &Value {
        match self {
            Played::Single { state, .. } | Played::Multi { state, .. } => state,
        }
    }

    /// Consumes the result, returning the new state.
    pub fn into_state(self) -> Value {
        match self {
            Played::Single { state, .. } | Played::Multi { state, .. } => state,
        }
    }

    /// Delta sequence of a single-filter game.
    pub fn reveal(&self) -> Option<&[Delta]> {
        match self {
            Played::Single { reveal, .. } => Some(reveal),
            Played::Multi { .. } => None,
        }
    }

    /// Delta sequence for one filter of a multi-filter game.
    pub fn reveal_for(&self, key: &str) -> Option<&[Delta]> {
        match self {
            Played::Single { .. } => None,
            Played::Multi {
                reveal_by_filter, ..
            } => reveal_by_filter.get(key).map(Vec::as_slice),
        }
    }

    /// Delta sequence for an observer, regardless of filter mode.
    ///
    /// Single-filter games ignore `key`.
    pub fn deltas(&self, key: Option<&str>) -> Option<&[Delta]> {
        match self {
            Played::Single { reveal, .. } => Some(reveal),
            Played::Multi {
                reveal_by_filter, ..
            } => key.and_then(|k| reveal_by_filter.get(k)).map(Vec::as_slice),
        }
    }

    fn assemble(mode: FilterMode, state: Value, mut deltas: BTreeMap<String, Vec<Delta>>) -> Self {
        match mode {
            FilterMode::Single => Played::Single {
                state,
                reveal: deltas.remove(DEFAULT_FILTER_KEY).unwrap_or_default(),
            },
            FilterMode::Multi => Played::Multi {
                state,
                reveal_by_filter: deltas,
            },
        }
    }
}

/// Marks an engine busy for the lifetime of one top-level invocation.
///
/// Released on drop, so the flag clears on every exit path.
struct ContextGuard<'e> {
    active: &'e AtomicBool,
}

impl<'e> ContextGuard<'e> {
    fn enter(active: &'e AtomicBool) -> Result<Self, EngineError> {
        active
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| {
                warn!("Rejected nested play/replay invocation");
                EngineError::Reentrant
            })?;
        Ok(Self { active })
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Play/replay executor for one game definition.
///
/// At most one play or replay may be active per engine. A nested or
/// overlapping call fails with [`EngineError::Reentrant`]. Separate engines
/// are independent.
#[derive(Debug)]
pub struct Engine<G> {
    game: G,
    config: EngineConfig,
    active: AtomicBool,
}

impl<G: GameDefinition> Engine<G> {
    /// Creates an engine with build-profile defaults.
    pub fn new(game: G) -> Self {
        Self::with_config(game, EngineConfig::default())
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(game: G, config: EngineConfig) -> Self {
        Self {
            game,
            config,
            active: AtomicBool::new(false),
        }
    }

    /// Returns the game definition.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns true while a play or replay is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Projects `state` through one of the game's filters.
    ///
    /// Single-filter games ignore `key`. Useful for computing an observer's
    /// initial view before any action has been played.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownFilter`] if a multi-filter game has no
    /// filter under `key`.
    #[instrument(skip(self, state))]
    pub fn filter(&self, state: &Value, key: Option<&str>) -> Result<Value, EngineError> {
        let filters = filter::resolve(&self.game, state);
        Ok(filters.get(key)?.project(state))
    }

    /// Authoritatively applies `action` to `state`.
    ///
    /// Returns the new state with the deltas each filter's observer needs to
    /// replay the action. When consistency checking is enabled, every
    /// filter's replay is verified before returning.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Reentrant`] if this engine is already running.
    /// - [`EngineError::Consistency`] if a replay diverges from the
    ///   filtered new state.
    /// - Any error from the game definition, unchanged.
    #[instrument(skip(self, state, action))]
    pub fn play(&self, state: &Value, action: &Value) -> Result<Played, EngineError> {
        let (filters, views, new_state, deltas) = {
            let _guard = ContextGuard::enter(&self.active)?;

            let filters = filter::resolve(&self.game, state);
            let views = filters.project_all(state);

            let mut draft = Draft::new(state.clone(), Ledger::play(&filters));
            let transition = self.game.update_state(&mut draft, action)?;
            let (drafted, ledger) = draft.finish();

            let deltas = ledger.into_recorded();
            let new_state = match transition {
                Transition::InPlace => drafted,
                Transition::Replace(replacement) => replacement,
            };
            (filters, views, new_state, deltas)
        };

        if *self.config.verify_consistency() {
            verify::check(self, &filters, &views, action, &deltas, &new_state)?;
        }

        info!(
            mode = %filters.mode(),
            filters = filters.len(),
            reveals = deltas.values().map(Vec::len).max().unwrap_or(0),
            "Played action"
        );
        Ok(Played::assemble(filters.mode(), new_state, deltas))
    }

    /// Reconstructs an observer's new view from their prior `view`, the
    /// `action`, and the deltas recorded for their filter.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Reentrant`] if this engine is already running.
    /// - [`EngineError::ReplayMisaligned`] if the transition function
    ///   performed a different number of reveals than `deltas` holds.
    /// - [`EngineError::Patch`] if a delta does not fit the view.
    /// - Any error from the game definition, unchanged.
    #[instrument(skip(self, view, action, deltas), fields(deltas = deltas.len()))]
    pub fn replay(&self, view: &Value, action: &Value, deltas: &[Delta]) -> Result<Value, EngineError> {
        let _guard = ContextGuard::enter(&self.active)?;

        let mut draft = Draft::new(view.clone(), Ledger::replay(deltas));
        let transition = self.game.update_state(&mut draft, action)?;
        let (drafted, ledger) = draft.finish();

        let consumed = ledger.consumed();
        if consumed != deltas.len() {
            warn!(
                recorded = deltas.len(),
                consumed,
                "Replay left recorded deltas unconsumed"
            );
            return Err(EngineError::ReplayMisaligned {
                recorded: deltas.len(),
                consumed,
            });
        }

        debug!("Replayed action");
        Ok(match transition {
            Transition::InPlace => drafted,
            Transition::Replace(replacement) => replacement,
        })
    }
}
