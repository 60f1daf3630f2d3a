//! Card shedding: every seat holds a private hand, everyone sees hand sizes.
//!
//! Seats take turns either playing a card from their hand onto a public
//! discard pile or drawing from the hidden deck. The running total of played
//! cards is public.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Mutex;
use super::fields_mut;
use strictly_reveal::{Draft, EngineError, Filter, Filters, GameDefinition, GameError, Transition};
use tracing::{debug, instrument};

/// Cards in a fresh deck, valued `1..=DECK_SIZE`.
pub const DECK_SIZE: u64 = 20;

/// Filter key for an observer who holds no hand.
pub const SPECTATOR: &str = "spectator";

/// Actions accepted by [`Cards`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardsAction {
    /// Shuffles a fresh deck and deals every seat a hand.
    Deal {
        /// Cards per hand.
        #[serde(rename = "handSize")]
        hand_size: usize,
    },
    /// Plays a card from the acting seat's hand.
    Play {
        /// Acting seat.
        player: String,
        /// Card value; must be in the seat's hand.
        card: u64,
    },
    /// Draws the top card of the deck into the acting seat's hand.
    Draw {
        /// Acting seat.
        player: String,
    },
}

/// Card game definition with one filter per seat plus a spectator filter.
#[derive(Debug)]
pub struct Cards {
    players: Vec<String>,
    rng: Mutex<StdRng>,
}

impl Cards {
    /// Creates a game for the given seats with an entropy-seeded RNG.
    ///
    /// Seat names must be unique and must not be [`SPECTATOR`]; a table that
    /// breaks either rule rejects every action.
    pub fn new<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            players: players.into_iter().map(Into::into).collect(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a game for the given seats with a deterministic RNG.
    pub fn seeded<I, S>(players: I, seed: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            players: players.into_iter().map(Into::into).collect(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seats in turn order.
    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Undealt table: seats, empty hands, nothing played.
    pub fn initial_state(&self) -> Value {
        let hands: Map<String, Value> = self
            .players
            .iter()
            .map(|p| (p.clone(), json!([])))
            .collect();
        json!({
            "players": self.players,
            "turn": 0,
            "dealt": false,
            "total": 0,
            "discard": [],
            "hands": hands,
        })
    }

    #[instrument(skip(self, full))]
    fn deal(&self, full: &mut Value, hand_size: usize) -> Result<(), GameError> {
        let seats = seats(full);
        let needed = hand_size.checked_mul(seats.len());
        if needed.is_none_or(|needed| needed as u64 > DECK_SIZE) {
            return Err(GameError::new(format!(
                "Cannot deal {} cards to {} seats from a deck of {}",
                hand_size,
                seats.len(),
                DECK_SIZE
            )));
        }

        let mut deck: Vec<u64> = (1..=DECK_SIZE).collect();
        {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| GameError::new("card RNG lock poisoned"))?;
            deck.shuffle(&mut *rng);
        }

        let mut hands = Map::new();
        for seat in &seats {
            let hand: Vec<u64> = deck.drain(..hand_size).collect();
            hands.insert(seat.clone(), json!(hand));
        }
        let fields = fields_mut(full, "state")?;
        fields.insert("hands".to_string(), Value::Object(hands));
        fields.insert("deck".to_string(), json!(deck));
        Ok(())
    }
}

fn seats(state: &Value) -> Vec<String> {
    state["players"]
        .as_array()
        .map(|players| {
            players
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn check_seats(state: &Value) -> Result<(), GameError> {
    let seats = seats(state);
    for (i, seat) in seats.iter().enumerate() {
        if seat == SPECTATOR {
            return Err(GameError::new(format!("Seat name {:?} is reserved", SPECTATOR)));
        }
        if seats[..i].contains(seat) {
            return Err(GameError::new(format!("Seat {:?} is taken twice", seat)));
        }
    }
    Ok(())
}

fn check_turn(state: &Value, player: &str) -> Result<(), GameError> {
    if state["dealt"] != json!(true) {
        return Err(GameError::new("Cards have not been dealt"));
    }
    let turn = state["turn"].as_u64().unwrap_or(0) as usize;
    match seats(state).get(turn) {
        Some(seat) if seat == player => Ok(()),
        Some(seat) => Err(GameError::new(format!(
            "It is {}'s turn, not {}'s",
            seat, player
        ))),
        None => Err(GameError::new("No seat holds the turn")),
    }
}

fn advance_turn(state: &mut Value) -> Result<(), GameError> {
    let seats = seats(state).len().max(1) as u64;
    let turn = state["turn"].as_u64().unwrap_or(0);
    fields_mut(state, "state")?.insert("turn".to_string(), json!((turn + 1) % seats));
    Ok(())
}

/// Projection for one seat, or for a spectator when `seat` is `None`.
///
/// Keeps only the seat's own hand, replaces the deck by its size and adds
/// every hand's size under `handCounts`.
fn seat_filter(seat: Option<String>) -> Filter {
    Filter::new(move |view| {
        let Some(fields) = view.as_object_mut() else {
            return;
        };
        let hands = fields.remove("hands");
        let counts: Map<String, Value> = hands
            .as_ref()
            .and_then(Value::as_object)
            .map(|hands| {
                hands
                    .iter()
                    .map(|(p, h)| (p.clone(), json!(h.as_array().map_or(0, Vec::len))))
                    .collect()
            })
            .unwrap_or_default();
        let deck_size = fields
            .remove("deck")
            .as_ref()
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        let mut own = Map::new();
        if let Some(seat) = &seat
            && let Some(hand) = hands.as_ref().and_then(|hands| hands.get(seat))
        {
            own.insert(seat.clone(), hand.clone());
        }

        fields.insert("hands".to_string(), Value::Object(own));
        fields.insert("handCounts".to_string(), Value::Object(counts));
        fields.insert("deckSize".to_string(), json!(deck_size));
    })
}

impl GameDefinition for Cards {
    #[instrument(skip(self, draft), fields(mode = %draft.mode()))]
    fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
        let action: CardsAction = serde_json::from_value(action.clone())
            .map_err(|e| GameError::new(format!("Invalid cards action: {}", e)))?;

        check_seats(&**draft)?;

        match action {
            CardsAction::Deal { hand_size } => {
                if draft["dealt"] == json!(true) {
                    return Err(GameError::new("Cards are already dealt").into());
                }
                draft.reveal(|full| self.deal(full, hand_size))?;
                fields_mut(&mut **draft, "state")?.insert("dealt".to_string(), json!(true));
                debug!(hand_size, "Dealt hands");
            }
            CardsAction::Play { player, card } => {
                check_turn(&**draft, &player)?;
                draft.reveal(|full| {
                    let hand = full
                        .get_mut("hands")
                        .and_then(|hands| hands.get_mut(&player))
                        .and_then(Value::as_array_mut)
                        .ok_or_else(|| GameError::new(format!("No hand for {}", player)))?;
                    let pos = hand
                        .iter()
                        .position(|c| c.as_u64() == Some(card))
                        .ok_or_else(|| {
                            GameError::new(format!("{} is not in {}'s hand", card, player))
                        })?;
                    hand.remove(pos);
                    Ok(())
                })?;

                let fields = fields_mut(&mut **draft, "state")?;
                let total = fields
                    .get("total")
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
                    .saturating_add(card);
                fields.insert("total".to_string(), json!(total));
                fields
                    .entry("discard")
                    .or_insert_with(|| json!([]))
                    .as_array_mut()
                    .ok_or_else(|| GameError::new("discard is not a list"))?
                    .push(json!(card));
                advance_turn(&mut **draft)?;
                debug!(%player, card, total, "Card played");
            }
            CardsAction::Draw { player } => {
                check_turn(&**draft, &player)?;
                draft.reveal(|full| {
                    let hand_exists = full
                        .get("hands")
                        .and_then(|hands| hands.get(&player))
                        .is_some_and(Value::is_array);
                    if !hand_exists {
                        return Err(GameError::new(format!("No hand for {}", player)));
                    }
                    let top = full
                        .get_mut("deck")
                        .and_then(Value::as_array_mut)
                        .filter(|deck| !deck.is_empty())
                        .ok_or_else(|| GameError::new("The deck is empty"))?
                        .remove(0);
                    if let Some(hand) = full
                        .get_mut("hands")
                        .and_then(|hands| hands.get_mut(&player))
                        .and_then(Value::as_array_mut)
                    {
                        hand.push(top);
                    }
                    Ok(())
                })?;
                advance_turn(&mut **draft)?;
                debug!(%player, "Card drawn");
            }
        }
        Ok(Transition::InPlace)
    }

    fn filters(&self, state: &Value) -> Filters {
        let observers = seats(state)
            .into_iter()
            .map(|seat| (seat.clone(), seat_filter(Some(seat))))
            .chain(std::iter::once((SPECTATOR.to_string(), seat_filter(None))));
        Filters::multi(observers)
    }
}
