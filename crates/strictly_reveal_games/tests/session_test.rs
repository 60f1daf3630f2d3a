//! Sessions and scripted demos across all bundled games.

use serde_json::{Value, json};
use strictly_reveal::{
    Draft, Engine, EngineConfig, EngineError, Filter, Filters, GameDefinition, Transition,
};
use strictly_reveal_games::games::Cards;
use strictly_reveal_games::games::cards::SPECTATOR;
use strictly_reveal_games::{AnyGame, GameKind, Session, demo};
use strum::IntoEnumIterator;

fn verifying() -> EngineConfig {
    EngineConfig::new().with_verify_consistency(true)
}

#[test]
fn test_every_game_demo_keeps_observers_in_sync() {
    for kind in GameKind::iter() {
        let session = demo::run(AnyGame::new(kind, Some(2024)), verifying(), 20).unwrap();
        assert!(!session.history().is_empty(), "{kind} played nothing");
        for (key, view) in session.views() {
            let lookup = (key != strictly_reveal::DEFAULT_FILTER_KEY).then_some(key.as_str());
            assert_eq!(view, &session.expected_view(lookup).unwrap(), "{kind}/{key}");
        }
    }
}

#[test]
fn test_racers_demo_stops_when_deck_runs_out() {
    let session = demo::run(AnyGame::new(GameKind::Racers, Some(1)), verifying(), 50).unwrap();
    // Start plus one move per card.
    assert_eq!(session.history().len(), 11);
}

#[test]
fn test_cards_session_tracks_every_seat() {
    let game = Cards::seeded(["north", "south", "east"], 8);
    let start = game.initial_state();
    let mut session = Session::new("table".to_string(), Engine::with_config(game, verifying()), start);

    session.apply(json!({"type": "deal", "handSize": 2})).unwrap();
    assert_eq!(
        session.views().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["east", "north", "south", SPECTATOR]
    );

    let north = session.view("north").unwrap();
    let card = north["hands"]["north"][0].clone();
    session
        .apply(json!({"type": "play", "player": "north", "card": card}))
        .unwrap();

    let south = session.view("south").unwrap();
    assert_eq!(south["handCounts"]["north"], 1);
    assert_eq!(south["total"], card);
}

#[test]
fn test_turns_serialize_for_transport() {
    let mut session = Session::new(
        "doors".to_string(),
        Engine::new(AnyGame::new(GameKind::Doors, Some(3))),
        json!({"openDoors": {}}),
    );
    session.apply(json!({"type": "setup"})).unwrap();

    let wire = serde_json::to_value(session.history()).unwrap();
    assert_eq!(wire[0]["action"], json!({"type": "setup"}));
    assert_eq!(wire[0]["played"]["reveal"], json!([[]]));
}

/// Copies the hidden prize into a visible field without a reveal.
struct LeakyDoors;

impl GameDefinition for LeakyDoors {
    fn update_state(&self, draft: &mut Draft<'_>, _action: &Value) -> Result<Transition, EngineError> {
        let prize = draft["doors"]["1"].clone();
        if let Some(fields) = draft.as_object_mut() {
            fields.insert("prize".to_string(), prize);
        }
        Ok(Transition::InPlace)
    }

    fn filters(&self, _state: &Value) -> Filters {
        Filters::Single(Filter::hide_keys(["doors"]))
    }
}

#[test]
fn test_drifted_view_is_reported() {
    let engine = Engine::with_config(LeakyDoors, EngineConfig::new().with_verify_consistency(false));
    let mut session = Session::new("leaky".to_string(), engine, json!({"doors": {"1": "car"}}));

    session.apply(json!({})).unwrap();
    let err = session.check_views().unwrap_err();
    let violation = err.consistency_violation().expect("consistency violation");
    assert_eq!(violation.filter(), strictly_reveal::DEFAULT_FILTER_KEY);
    assert_eq!(violation.expected(), &json!({"prize": "car"}));
    assert_eq!(violation.replayed(), &json!({"prize": null}));
}
