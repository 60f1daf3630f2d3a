//! Nested play/replay invocations are rejected before touching any state.

use serde_json::{Value, json};
use std::sync::{Arc, OnceLock, Weak};
use strictly_reveal::{Draft, Engine, EngineError, GameDefinition, Transition};

#[derive(Debug, Clone, Copy)]
enum Nesting {
    PlayFromTransition,
    ReplayFromTransition,
    PlayFromReveal,
}

/// A game that calls back into its own engine.
struct Nested {
    how: Nesting,
    engine: OnceLock<Weak<Engine<Nested>>>,
}

impl Nested {
    fn engine(how: Nesting) -> Arc<Engine<Nested>> {
        let engine = Arc::new(Engine::new(Nested {
            how,
            engine: OnceLock::new(),
        }));
        engine
            .game()
            .engine
            .set(Arc::downgrade(&engine))
            .expect("engine slot set once");
        engine
    }

    fn inner(&self) -> Arc<Engine<Nested>> {
        self.engine
            .get()
            .and_then(Weak::upgrade)
            .expect("engine outlives its game")
    }
}

impl GameDefinition for Nested {
    fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
        match self.how {
            Nesting::PlayFromTransition => {
                self.inner().play(&**draft, action)?;
            }
            Nesting::ReplayFromTransition => {
                self.inner().replay(&**draft, action, &[])?;
            }
            Nesting::PlayFromReveal => {
                let inner = self.inner();
                let mut nested = None;
                draft.reveal(|full| {
                    nested = Some(inner.play(full, action));
                    full["touched"] = json!(true);
                    Ok(())
                })?;
                nested.expect("transform ran")?;
            }
        }
        draft["touched"] = json!(true);
        Ok(Transition::InPlace)
    }
}

#[test]
fn test_play_inside_transition_is_rejected() {
    let engine = Nested::engine(Nesting::PlayFromTransition);
    let state = json!({"untouched": true});

    let err = engine.play(&state, &json!({})).unwrap_err();
    assert!(err.is_reentrant());
    assert_eq!(state, json!({"untouched": true}));
    assert!(!engine.is_active());
}

#[test]
fn test_replay_inside_transition_is_rejected() {
    let engine = Nested::engine(Nesting::ReplayFromTransition);
    let err = engine.replay(&json!({}), &json!({}), &[]).unwrap_err();
    assert_eq!(err, EngineError::Reentrant);
    assert!(!engine.is_active());
}

#[test]
fn test_play_inside_reveal_transform_is_rejected() {
    let engine = Nested::engine(Nesting::PlayFromReveal);
    let err = engine.play(&json!({}), &json!({})).unwrap_err();
    assert!(err.is_reentrant());
}

#[test]
fn test_engine_usable_after_rejection() {
    let engine = Nested::engine(Nesting::PlayFromTransition);
    assert!(engine.play(&json!({}), &json!({})).is_err());
    assert!(engine.play(&json!({}), &json!({})).is_err());
    assert!(!engine.is_active());
}

#[test]
fn test_separate_engines_are_independent() {
    let first = Nested::engine(Nesting::PlayFromTransition);
    let second = Nested::engine(Nesting::PlayFromTransition);
    assert!(first.play(&json!({}), &json!({})).unwrap_err().is_reentrant());
    assert!(second.play(&json!({}), &json!({})).unwrap_err().is_reentrant());
}
