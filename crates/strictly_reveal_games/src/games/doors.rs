//! Monty Hall: three doors, one car, contents hidden until a door is opened.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Mutex;
use super::fields_mut;
use strictly_reveal::{Draft, EngineError, Filter, Filters, GameDefinition, GameError, Transition};
use tracing::{debug, instrument};

/// Number of doors on stage.
pub const DOOR_COUNT: u8 = 3;

/// Actions accepted by [`Doors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DoorsAction {
    /// Hides a car behind a random door and goats behind the rest.
    Setup,
    /// Opens a door; its contents become the prize.
    Open {
        /// Door number, 1-based.
        door: u8,
    },
}

/// Monty Hall game definition.
///
/// The `doors` map is hidden from observers. Opening a door reveals that one
/// door's contents into `openDoors`, and the prize is read from there.
#[derive(Debug)]
pub struct Doors {
    rng: Mutex<StdRng>,
}

impl Doors {
    /// Creates a game with an entropy-seeded RNG.
    #[instrument]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a game with a deterministic RNG.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// State before [`DoorsAction::Setup`].
    pub fn initial_state(&self) -> Value {
        json!({"openDoors": {}})
    }

    fn shuffled_doors(&self) -> Result<Value, GameError> {
        let mut contents = vec!["goat"; usize::from(DOOR_COUNT)];
        contents[0] = "car";
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| GameError::new("door RNG lock poisoned"))?;
        contents.shuffle(&mut *rng);

        let doors: serde_json::Map<String, Value> = contents
            .into_iter()
            .enumerate()
            .map(|(i, c)| ((i + 1).to_string(), json!(c)))
            .collect();
        Ok(Value::Object(doors))
    }
}

impl Default for Doors {
    fn default() -> Self {
        Self::new()
    }
}

impl GameDefinition for Doors {
    #[instrument(skip(self, draft), fields(mode = %draft.mode()))]
    fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
        let action: DoorsAction = serde_json::from_value(action.clone())
            .map_err(|e| GameError::new(format!("Invalid doors action: {}", e)))?;

        match action {
            DoorsAction::Setup => {
                **draft = self.initial_state();
                draft.reveal(|full| {
                    full["doors"] = self.shuffled_doors()?;
                    Ok(())
                })?;
            }
            DoorsAction::Open { door } => {
                if !(1..=DOOR_COUNT).contains(&door) {
                    return Err(GameError::new(format!("No door {}", door)).into());
                }
                let key = door.to_string();
                match draft.get("openDoors").and_then(Value::as_object) {
                    Some(open) if open.contains_key(&key) => {
                        return Err(GameError::new(format!("Door {} is already open", door)).into());
                    }
                    Some(_) => {}
                    None => return Err(GameError::new("openDoors is not an object").into()),
                }

                draft.reveal(|full| {
                    let behind = full
                        .get("doors")
                        .and_then(|doors| doors.get(&key))
                        .cloned()
                        .ok_or_else(|| GameError::new("Doors have not been set up"))?;
                    fields_mut(full, "state")?
                        .get_mut("openDoors")
                        .and_then(Value::as_object_mut)
                        .ok_or_else(|| GameError::new("openDoors is not an object"))?
                        .insert(key.clone(), behind);
                    Ok(())
                })?;

                let prize = draft["openDoors"][&key].clone();
                debug!(door, prize = %prize, "Door opened");
                fields_mut(&mut **draft, "state")?.insert("prize".to_string(), prize);
            }
        }
        Ok(Transition::InPlace)
    }

    fn filters(&self, _state: &Value) -> Filters {
        Filters::Single(Filter::hide_keys(["doors"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_reveal::{Engine, EngineConfig};

    fn engine() -> Engine<Doors> {
        Engine::with_config(
            Doors::seeded(7),
            EngineConfig::new().with_verify_consistency(true),
        )
    }

    #[test]
    fn test_setup_hides_doors_from_observers() {
        let engine = engine();
        let start = engine.game().initial_state();
        let played = engine.play(&start, &json!({"type": "setup"})).unwrap();

        let doors = played.state()["doors"].as_object().unwrap();
        assert_eq!(doors.len(), 3);
        assert_eq!(doors.values().filter(|d| *d == "car").count(), 1);

        // Nothing about the doors is visible, so the reveal carries no edits.
        assert!(played.reveal().unwrap().iter().all(|d| d.is_empty()));
    }

    #[test]
    fn test_open_reveals_only_the_opened_door() {
        let engine = engine();
        let setup = engine
            .play(&engine.game().initial_state(), &json!({"type": "setup"}))
            .unwrap()
            .into_state();

        let action = json!({"type": "open", "door": 2});
        let played = engine.play(&setup, &action).unwrap();
        let behind = setup["doors"]["2"].clone();
        assert_eq!(played.state()["prize"], behind);

        let view = engine.filter(&setup, None).unwrap();
        let new_view = engine
            .replay(&view, &action, played.reveal().unwrap())
            .unwrap();
        assert_eq!(new_view, json!({"openDoors": {"2": behind}, "prize": behind}));
    }

    #[test]
    fn test_reopening_a_door_is_rejected() {
        let engine = engine();
        let setup = engine
            .play(&engine.game().initial_state(), &json!({"type": "setup"}))
            .unwrap()
            .into_state();
        let action = json!({"type": "open", "door": 1});
        let opened = engine.play(&setup, &action).unwrap().into_state();

        let err = engine.play(&opened, &action).unwrap_err();
        assert!(err.to_string().contains("already open"));
    }

    #[test]
    fn test_malformed_state_is_game_error() {
        let engine = engine();
        let action = json!({"type": "open", "door": 1});
        for state in [
            json!({"openDoors": 5, "doors": {"1": "car"}}),
            json!([1, 2]),
            json!({"openDoors": {}}),
            json!({"openDoors": {}, "doors": 3}),
        ] {
            let err = engine.play(&state, &action).unwrap_err();
            assert!(matches!(err, EngineError::Game(_)), "{state}: {err}");
        }
    }

    #[test]
    fn test_invalid_door() {
        let engine = engine();
        let err = engine
            .play(&json!({"openDoors": {}}), &json!({"type": "open", "door": 4}))
            .unwrap_err();
        assert!(err.to_string().contains("No door 4"));
    }
}
