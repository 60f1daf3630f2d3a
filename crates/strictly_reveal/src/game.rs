//! The capability set a game definition implements.

use crate::error::EngineError;
use crate::filter::Filters;
use crate::ledger::Draft;
use serde_json::Value;

/// What a transition function did with its draft.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Transition {
    /// The draft was edited in place and becomes the new state.
    #[default]
    InPlace,
    /// The draft is discarded and this value becomes the new state.
    ///
    /// Typically used by initialization actions.
    Replace(Value),
}

/// A turn-based game: a transition function plus observer filters.
///
/// The same [`update_state`](GameDefinition::update_state) runs on the
/// authoritative side (play) and on every observer (replay). It must be
/// deterministic given the draft and the action, except inside
/// [`Draft::reveal`], which is the only place randomness or hidden-state
/// reads may influence the result.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use strictly_reveal::{Draft, Engine, EngineError, Filters, GameDefinition, Transition};
///
/// struct MontyHall;
///
/// impl GameDefinition for MontyHall {
///     fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
///         let door = action["door"].to_string();
///         draft.reveal(|full| {
///             full["openDoors"][&door] = full["doors"][&door].clone();
///             Ok(())
///         })?;
///         draft["prize"] = draft["openDoors"][&door].clone();
///         Ok(Transition::InPlace)
///     }
///
///     fn filters(&self, _state: &Value) -> Filters {
///         Filters::single(|view| {
///             if let Some(map) = view.as_object_mut() {
///                 map.remove("doors");
///             }
///         })
///     }
/// }
///
/// let engine = Engine::new(MontyHall);
/// let start = json!({"doors": {"1": "goat", "2": "goat", "3": "car"}, "openDoors": {}});
/// let played = engine.play(&start, &json!({"door": 1})).unwrap();
/// let view = engine.filter(&start, None).unwrap();
/// let new_view = engine.replay(&view, &json!({"door": 1}), played.reveal().unwrap()).unwrap();
/// assert_eq!(new_view, json!({"openDoors": {"1": "goat"}, "prize": "goat"}));
/// ```
pub trait GameDefinition {
    /// Applies `action` to `draft`.
    ///
    /// # Errors
    ///
    /// Game-level failures are returned as [`EngineError::Game`] and reach
    /// the caller unchanged. Errors from [`Draft::reveal`] should be
    /// propagated with `?`.
    fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError>;

    /// Returns the observer filters to use for `state`.
    ///
    /// Called once per top-level invocation with the prior state, so a game
    /// can return, say, one filter per player currently seated. Defaults to
    /// full visibility.
    fn filters(&self, state: &Value) -> Filters {
        let _ = state;
        Filters::unfiltered()
    }
}
