//! Error types for the play/replay engine.

use crate::delta::{Delta, PatchError};
use derive_more::{Display, Error};
use serde_json::Value;
use tracing::instrument;

/// Failure raised by game-definition code (transition functions and reveal
/// transforms), with caller location tracking.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Game error: {} at {}:{}", message, file, line)]
pub struct GameError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl GameError {
    /// Creates a new game error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Replayed view disagreed with the filtered authoritative result.
#[derive(Debug, Clone, PartialEq, derive_new::new, derive_getters::Getters)]
pub struct ConsistencyViolation {
    /// Filter whose replay diverged.
    filter: String,
    /// Authoritative new state projected through the filter.
    expected: Value,
    /// View reconstructed by replaying the recorded deltas.
    replayed: Value,
    /// Edits turning `replayed` into `expected`.
    diff: Delta,
}

/// Errors from [`Engine`](crate::Engine) operations.
///
/// [`EngineError::Reentrant`], [`EngineError::Consistency`] and
/// [`EngineError::ReplayMisaligned`] signal bugs in the calling code or the
/// game definition. [`EngineError::Game`] carries the game's own failures.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum EngineError {
    /// A play or replay was started while another was active on the same engine.
    #[display("Nested calls to play()/replay() are not supported")]
    Reentrant,

    /// Replaying the action did not reproduce the filtered new state.
    #[display(
        "Result of replaying the action did not match the new state (filter {:?}, {} differing edits)",
        _0.filter(),
        _0.diff().len()
    )]
    Consistency(Box<ConsistencyViolation>),

    /// Replay consumed a different number of deltas than were recorded.
    #[display("Replay misaligned: {} deltas recorded, {} reveals requested", recorded, consumed)]
    ReplayMisaligned {
        /// Deltas supplied to the replay.
        recorded: usize,
        /// Reveals performed by the transition function.
        consumed: usize,
    },

    /// The requested filter key was not produced by the game's filters.
    #[display("Unknown filter: {:?}", _0)]
    UnknownFilter(Option<String>),

    /// A recorded delta did not apply to the view being replayed.
    #[display("Delta did not apply: {}", _0)]
    Patch(PatchError),

    /// The game definition reported a failure.
    #[display("{}", _0)]
    Game(GameError),
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Patch(err) => Some(err),
            EngineError::Game(err) => Some(err),
            _ => None,
        }
    }
}

impl EngineError {
    /// Returns true for a rejected nested invocation.
    pub fn is_reentrant(&self) -> bool {
        matches!(self, EngineError::Reentrant)
    }

    /// Returns true when the consistency check failed.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, EngineError::Consistency(_))
    }

    /// Returns the consistency report, if this is a consistency violation.
    pub fn consistency_violation(&self) -> Option<&ConsistencyViolation> {
        match self {
            EngineError::Consistency(violation) => Some(violation.as_ref()),
            _ => None,
        }
    }
}

impl From<GameError> for EngineError {
    fn from(err: GameError) -> Self {
        EngineError::Game(err)
    }
}

impl From<PatchError> for EngineError {
    fn from(err: PatchError) -> Self {
        EngineError::Patch(err)
    }
}

impl From<ConsistencyViolation> for EngineError {
    fn from(violation: ConsistencyViolation) -> Self {
        EngineError::Consistency(Box::new(violation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_game_error_tracks_location() {
        let err = GameError::new("empty deck");
        assert_eq!(err.message, "empty deck");
        assert!(err.file.ends_with("error.rs"));
        assert!(err.to_string().contains("empty deck"));
    }

    #[test]
    fn test_kind_predicates() {
        assert!(EngineError::Reentrant.is_reentrant());

        let violation = ConsistencyViolation::new(
            "default".to_string(),
            json!({"prize": "goat"}),
            json!({"prize": null}),
            crate::delta::diff(&json!({"prize": null}), &json!({"prize": "goat"})),
        );
        let err = EngineError::from(violation);
        assert!(err.is_consistency_violation());
        assert!(!err.is_reentrant());
        assert_eq!(err.consistency_violation().unwrap().filter(), "default");
        assert!(err.to_string().contains("did not match"));
    }
}
