//! Racers: two players, two pawns each, movement decided by a hidden deck.
//!
//! Each turn the player picks a pawn, then the top card of the deck is
//! revealed and the pawn advances that many squares. A pawn landing on an
//! opponent's pawn sends it back to the start.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Mutex;
use super::fields_mut;
use strictly_reveal::{Draft, EngineError, Filter, Filters, GameDefinition, GameError, Transition};
use tracing::{debug, info, instrument};

/// Deck used when the order is fixed rather than shuffled.
pub const CLASSIC_DECK: [u64; 10] = [2, 3, 1, 10, 5, 9, 8, 4, 6, 7];

/// Pawns per player.
pub const PAWNS: usize = 2;

/// Actions accepted by [`Racers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RacersAction {
    /// Places all pawns on square 0 and prepares the deck.
    Start,
    /// Moves one of the current player's pawns.
    Move {
        /// Pawn index, `0` or `1`.
        pawn: usize,
    },
}

/// How the deck is ordered on [`RacersAction::Start`].
#[derive(Debug)]
enum DeckOrder {
    Fixed(Vec<u64>),
    Shuffled(Mutex<StdRng>),
}

/// Racers game definition. The deck is hidden; observers see its size.
#[derive(Debug)]
pub struct Racers {
    deck: DeckOrder,
}

impl Racers {
    /// Creates a game whose deck is shuffled with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self {
            deck: DeckOrder::Shuffled(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Creates a game whose deck is shuffled with a deterministic RNG.
    pub fn seeded(seed: u64) -> Self {
        Self {
            deck: DeckOrder::Shuffled(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Creates a game that always deals `deck` in the given order.
    pub fn with_deck(deck: impl Into<Vec<u64>>) -> Self {
        Self {
            deck: DeckOrder::Fixed(deck.into()),
        }
    }

    /// State before [`RacersAction::Start`].
    pub fn initial_state(&self) -> Value {
        json!({})
    }

    fn fresh_deck(&self) -> Result<Vec<u64>, GameError> {
        match &self.deck {
            DeckOrder::Fixed(deck) => Ok(deck.clone()),
            DeckOrder::Shuffled(rng) => {
                let mut deck = CLASSIC_DECK.to_vec();
                let mut rng = rng
                    .lock()
                    .map_err(|_| GameError::new("deck RNG lock poisoned"))?;
                deck.shuffle(&mut *rng);
                Ok(deck)
            }
        }
    }
}

impl Default for Racers {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the player to move.
fn current_player(state: &Value) -> Result<usize, GameError> {
    match state["player"].as_u64() {
        Some(p @ (0 | 1)) => Ok(p as usize),
        _ => Err(GameError::new("Race has not started")),
    }
}

/// Pawn squares, indexed `[player][pawn]`.
fn pawns(state: &Value) -> Result<[[u64; PAWNS]; 2], GameError> {
    state
        .get("pawns")
        .cloned()
        .and_then(|pawns| serde_json::from_value(pawns).ok())
        .ok_or_else(|| GameError::new("Race has not started"))
}

impl GameDefinition for Racers {
    #[instrument(skip(self, draft), fields(mode = %draft.mode()))]
    fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
        let action: RacersAction = serde_json::from_value(action.clone())
            .map_err(|e| GameError::new(format!("Invalid racers action: {}", e)))?;

        match action {
            RacersAction::Start => {
                **draft = json!({
                    "player": 0,
                    "pawns": [[0, 0], [0, 0]],
                });
                draft.reveal(|full| {
                    full["deck"] = json!(self.fresh_deck()?);
                    Ok(())
                })?;
                info!("Race started");
            }
            RacersAction::Move { pawn } => {
                if pawn >= PAWNS {
                    return Err(GameError::new(format!("No pawn {}", pawn)).into());
                }
                let player = current_player(&**draft)?;
                let mut squares = pawns(&**draft)?;

                draft.reveal(|full| {
                    let fields = fields_mut(full, "state")?;
                    let deck = fields
                        .get_mut("deck")
                        .and_then(Value::as_array_mut)
                        .filter(|deck| !deck.is_empty())
                        .ok_or_else(|| GameError::new("The deck is exhausted"))?;
                    let top = deck.remove(0);
                    fields.insert("revealedCard".to_string(), top);
                    Ok(())
                })?;

                let distance = draft["revealedCard"].as_u64().unwrap_or(0);
                let landed = squares[player][pawn].saturating_add(distance);
                squares[player][pawn] = landed;

                let opponent = 1 - player;
                for (other, square) in squares[opponent].iter_mut().enumerate() {
                    if *square == landed {
                        *square = 0;
                        debug!(opponent, pawn = other, square = landed, "Pawn captured");
                    }
                }

                let fields = fields_mut(&mut **draft, "state")?;
                fields.insert("pawns".to_string(), json!(squares));
                fields.insert("player".to_string(), json!(opponent));
                debug!(player, pawn, distance, landed, "Pawn moved");
            }
        }
        Ok(Transition::InPlace)
    }

    fn filters(&self, _state: &Value) -> Filters {
        Filters::Single(Filter::new(|view| {
            let Some(fields) = view.as_object_mut() else {
                return;
            };
            let deck_size = fields
                .remove("deck")
                .as_ref()
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            fields.insert("deckSize".to_string(), json!(deck_size));
        }))
    }
}
