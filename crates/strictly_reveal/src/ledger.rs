//! Reveal ledger: the per-invocation execution context handed to game code.
//!
//! During play, every [`Draft::reveal`] records one delta per filter. During
//! replay, every reveal consumes the next recorded delta instead of running
//! its transform.

use crate::delta::{self, Delta};
use crate::error::{EngineError, GameError};
use crate::filter::ResolvedFilters;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use tracing::{debug, instrument, warn};

/// Execution mode of the active invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Mode {
    /// Authoritative execution over the full state.
    #[display("play")]
    Play,
    /// Observer-side reconstruction from recorded deltas.
    #[display("replay")]
    Replay,
}

/// Bookkeeping for one invocation.
#[derive(Debug)]
pub(crate) enum Ledger<'a> {
    Play {
        filters: &'a ResolvedFilters,
        deltas: BTreeMap<String, Vec<Delta>>,
    },
    Replay {
        deltas: &'a [Delta],
        cursor: usize,
    },
}

impl<'a> Ledger<'a> {
    /// Opens a play ledger with an empty sequence per filter.
    pub(crate) fn play(filters: &'a ResolvedFilters) -> Self {
        let deltas = filters.keys().map(|k| (k.to_string(), Vec::new())).collect();
        Ledger::Play { filters, deltas }
    }

    /// Opens a replay ledger with the cursor at the first delta.
    pub(crate) fn replay(deltas: &'a [Delta]) -> Self {
        Ledger::Replay { deltas, cursor: 0 }
    }

    /// Per-filter delta sequences recorded during play. Empty for replay.
    pub(crate) fn into_recorded(self) -> BTreeMap<String, Vec<Delta>> {
        match self {
            Ledger::Play { deltas, .. } => deltas,
            Ledger::Replay { .. } => BTreeMap::new(),
        }
    }

    /// Number of deltas a replay has applied. Zero for play.
    pub(crate) fn consumed(&self) -> usize {
        match self {
            Ledger::Play { .. } => 0,
            Ledger::Replay { cursor, .. } => *cursor,
        }
    }

    fn mode(&self) -> Mode {
        match self {
            Ledger::Play { .. } => Mode::Play,
            Ledger::Replay { .. } => Mode::Replay,
        }
    }
}

/// Mutable view of the state under transition, plus its reveal ledger.
///
/// Dereferences to [`Value`], so game code reads and writes it like a plain
/// tree. Every draft belongs to exactly one play or replay invocation.
#[derive(Debug)]
pub struct Draft<'a> {
    state: Value,
    ledger: Ledger<'a>,
}

impl<'a> Draft<'a> {
    pub(crate) fn new(state: Value, ledger: Ledger<'a>) -> Self {
        Self { state, ledger }
    }

    /// Whether this draft is being played or replayed.
    ///
    /// For diagnostics only: branching on it breaks replay equivalence.
    pub fn mode(&self) -> Mode {
        self.ledger.mode()
    }

    /// Performs a controlled mutation whose filtered effect is recorded as a
    /// delta during play and re-applied from that delta during replay.
    ///
    /// `transform` runs only during play, against the full state. It is the
    /// place for randomness, shuffles, and reads of hidden state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Game`] if `transform` fails,
    /// [`EngineError::ReplayMisaligned`] if a replay runs out of deltas, and
    /// [`EngineError::Patch`] if a recorded delta does not fit the view.
    #[instrument(skip_all, fields(mode = %self.mode()))]
    pub fn reveal<F>(&mut self, transform: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Value) -> Result<(), GameError>,
    {
        match &mut self.ledger {
            Ledger::Play { filters, deltas } => {
                // Snapshot before the transform so the pre-reveal views stay
                // independent of the live draft.
                let snapshot = self.state.clone();
                let before = filters.project_all(&snapshot);

                transform(&mut self.state)?;

                for (key, filter) in filters.iter() {
                    let after = filter.project(&self.state);
                    let delta = delta::diff(&before[key], &after);
                    debug!(filter = key, edits = delta.len(), "Recorded reveal");
                    deltas.entry(key.to_string()).or_default().push(delta);
                }
                Ok(())
            }
            Ledger::Replay { deltas, cursor } => {
                let Some(delta) = deltas.get(*cursor) else {
                    warn!(
                        recorded = deltas.len(),
                        requested = *cursor + 1,
                        "Replay requested more reveals than were recorded"
                    );
                    return Err(EngineError::ReplayMisaligned {
                        recorded: deltas.len(),
                        consumed: *cursor + 1,
                    });
                };
                delta::patch(&mut self.state, delta)?;
                debug!(index = *cursor, edits = delta.len(), "Replayed reveal");
                *cursor += 1;
                Ok(())
            }
        }
    }

    /// Consumes the draft, returning the state and the finished ledger.
    pub(crate) fn finish(self) -> (Value, Ledger<'a>) {
        (self.state, self.ledger)
    }
}

impl Deref for Draft<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.state
    }
}

impl DerefMut for Draft<'_> {
    fn deref_mut(&mut self) -> &mut Value {
        &mut self.state
    }
}
