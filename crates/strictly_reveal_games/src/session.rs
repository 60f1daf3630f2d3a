//! Game session: the authoritative state plus every observer's replayed view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strictly_reveal::{
    ConsistencyViolation, DEFAULT_FILTER_KEY, Engine, EngineError, GameDefinition, Played, diff,
};
use tracing::{debug, error, info, instrument};

/// Unique identifier for a game session.
pub type SessionId = String;

/// One applied action and what it revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// The action as submitted.
    pub action: Value,
    /// Authoritative result, including per-filter deltas.
    pub played: Played,
}

/// A game in progress.
///
/// Holds the authoritative state on the server side and, for each filter,
/// the view an observer would hold after replaying every action. Observers
/// appear the first time the game's filters name them and drop out when a
/// filter disappears.
#[derive(Debug)]
pub struct Session<G> {
    id: SessionId,
    engine: Engine<G>,
    state: Value,
    views: BTreeMap<String, Value>,
    history: Vec<Turn>,
}

impl<G: GameDefinition> Session<G> {
    /// Creates a session starting from `state`.
    #[instrument(skip(engine, state))]
    pub fn new(id: SessionId, engine: Engine<G>, state: Value) -> Self {
        info!(session_id = %id, "Creating new game session");
        Self {
            id,
            engine,
            state,
            views: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The engine driving this session.
    pub fn engine(&self) -> &Engine<G> {
        &self.engine
    }

    /// Current authoritative state.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Every applied action, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Replayed views by filter key. Single-filter games use
    /// [`DEFAULT_FILTER_KEY`].
    pub fn views(&self) -> &BTreeMap<String, Value> {
        &self.views
    }

    /// Replayed view of one observer, if it has seen an action yet.
    pub fn view(&self, key: &str) -> Option<&Value> {
        self.views.get(key)
    }

    /// What the observer should be seeing, projected fresh from the state.
    pub fn expected_view(&self, key: Option<&str>) -> Result<Value, EngineError> {
        self.engine.filter(&self.state, key)
    }

    /// Checks every replayed view against a fresh projection of the state.
    ///
    /// # Errors
    ///
    /// [`EngineError::Consistency`] naming the first observer whose view
    /// drifted. Any filter lookup error, unchanged.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn check_views(&self) -> Result<(), EngineError> {
        for (key, view) in &self.views {
            let lookup = (key != DEFAULT_FILTER_KEY).then_some(key.as_str());
            let expected = self.expected_view(lookup)?;
            let drift = diff(view, &expected);
            if !drift.is_empty() {
                error!(
                    observer = %key,
                    turn = self.history.len(),
                    edits = drift.len(),
                    "Observer view drifted from state"
                );
                return Err(ConsistencyViolation::new(key.clone(), expected, view.clone(), drift).into());
            }
        }
        Ok(())
    }

    /// Plays `action`, then replays it for every observer.
    ///
    /// Nothing changes unless the play and every replay succeed.
    #[instrument(skip(self, action), fields(session_id = %self.id, turn = self.history.len()))]
    pub fn apply(&mut self, action: Value) -> Result<&Played, EngineError> {
        let played = self.engine.play(&self.state, &action)?;

        let keys: Vec<Option<String>> = match &played {
            Played::Single { .. } => vec![None],
            Played::Multi {
                reveal_by_filter, ..
            } => reveal_by_filter.keys().cloned().map(Some).collect(),
        };

        let mut views = BTreeMap::new();
        for key in keys {
            let slot = key.clone().unwrap_or_else(|| DEFAULT_FILTER_KEY.to_string());
            let prior = match self.views.get(&slot) {
                Some(view) => view.clone(),
                None => {
                    debug!(observer = %slot, "Observer joined");
                    self.engine.filter(&self.state, key.as_deref())?
                }
            };
            let deltas = played.deltas(key.as_deref()).unwrap_or_default();
            let view = self.engine.replay(&prior, &action, deltas)?;
            views.insert(slot, view);
        }

        for gone in self.views.keys().filter(|k| !views.contains_key(*k)) {
            debug!(observer = %gone, "Observer left");
        }

        self.views = views;
        self.state = played.state().clone();
        self.history.push(Turn { action, played });
        info!(observers = self.views.len(), "Action applied");

        let last = self.history.len() - 1;
        Ok(&self.history[last].played)
    }
}
