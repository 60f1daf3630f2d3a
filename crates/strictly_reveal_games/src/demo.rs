//! Scripted self-play used by the `demo` command.
//!
//! Each game gets a simple policy that only looks at what an observer may
//! see, so the demo doubles as an end-to-end check that observers can follow
//! a whole game from deltas alone.

use crate::games::{AnyGame, GameKind, cards::SPECTATOR};
use crate::session::Session;
use serde_json::{Value, json};
use strictly_reveal::{DEFAULT_FILTER_KEY, Engine, EngineConfig, EngineError};
use tracing::{info, instrument};

/// Picks the next action from observer views, or `None` when the game has
/// nothing left to do.
pub fn next_action(session: &Session<AnyGame>, turn: usize) -> Option<Value> {
    let kind = session.engine().game().kind();
    if turn == 0 {
        return Some(match kind {
            GameKind::Doors => json!({"type": "setup"}),
            GameKind::Cards => json!({"type": "deal", "handSize": 3}),
            GameKind::Racers => json!("start"),
        });
    }

    match kind {
        GameKind::Doors => {
            let view = session.view(DEFAULT_FILTER_KEY)?;
            let closed = (1..=crate::games::doors::DOOR_COUNT)
                .find(|door| view["openDoors"][door.to_string()].is_null())?;
            Some(json!({"type": "open", "door": closed}))
        }
        GameKind::Racers => {
            let view = session.view(DEFAULT_FILTER_KEY)?;
            if view["deckSize"].as_u64().unwrap_or(0) == 0 {
                return None;
            }
            // Alternate pawns every full round.
            let pawn = (turn - 1) / 2 % 2;
            Some(json!({"move": {"pawn": pawn}}))
        }
        GameKind::Cards => {
            let spectator = session.view(SPECTATOR)?;
            let turn_index = spectator["turn"].as_u64()? as usize;
            let seat = spectator["players"][turn_index].as_str()?;
            let own = session.view(seat)?;
            match own["hands"][seat].as_array().and_then(|hand| hand.first()) {
                Some(card) => Some(json!({"type": "play", "player": seat, "card": card})),
                None if spectator["deckSize"].as_u64().unwrap_or(0) > 0 => {
                    Some(json!({"type": "draw", "player": seat}))
                }
                None => None,
            }
        }
    }
}

/// Plays up to `turns` actions of `game`, checking every observer's view
/// against the authoritative state after each one.
///
/// # Errors
///
/// Fails on the first action the engine rejects, or with
/// [`EngineError::Consistency`] once any observer's view drifts.
#[instrument(skip(game, config), fields(game = %game.kind()))]
pub fn run(game: AnyGame, config: EngineConfig, turns: usize) -> Result<Session<AnyGame>, EngineError> {
    let state = game.initial_state();
    let id = format!("demo-{}", game.kind());
    let mut session = Session::new(id, Engine::with_config(game, config), state);

    for turn in 0..turns {
        let Some(action) = next_action(&session, turn) else {
            info!(turn, "Nothing left to play");
            break;
        };
        session.apply(action)?;
        session.check_views()?;
    }
    Ok(session)
}
