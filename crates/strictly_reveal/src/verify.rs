//! Consistency verifier: replay equivalence for every filter.
//!
//! After a play, each observer's replay of the recorded deltas must reproduce
//! the authoritative new state projected through that observer's filter. A
//! mismatch means the transition function mutated state nondeterministically
//! outside a reveal, or let hidden state leak into a visible field.

use crate::delta::{self, Delta};
use crate::engine::Engine;
use crate::error::{ConsistencyViolation, EngineError};
use crate::filter::ResolvedFilters;
use crate::game::GameDefinition;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

/// Replays `action` for every filter and compares against `new_state`.
///
/// `views` holds each filter's pre-transition view and `deltas` each filter's
/// recorded sequence, both keyed like `filters`.
#[instrument(skip_all, fields(filters = filters.len()))]
pub(crate) fn check<G: GameDefinition>(
    engine: &Engine<G>,
    filters: &ResolvedFilters,
    views: &BTreeMap<String, Value>,
    action: &Value,
    deltas: &BTreeMap<String, Vec<Delta>>,
    new_state: &Value,
) -> Result<(), EngineError> {
    for (key, filter) in filters.iter() {
        let recorded = deltas.get(key).map(Vec::as_slice).unwrap_or_default();
        let replayed = engine.replay(&views[key], action, recorded)?;
        let expected = filter.project(new_state);

        let diff = delta::diff(&replayed, &expected);
        if !diff.is_empty() {
            error!(
                filter = key,
                expected = %expected,
                replayed = %replayed,
                edits = diff.len(),
                "Result of replaying the action did not match the new state"
            );
            return Err(ConsistencyViolation::new(key.to_string(), expected, replayed, diff).into());
        }
        debug!(filter = key, "Replay matches filtered state");
    }
    Ok(())
}
