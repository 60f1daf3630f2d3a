//! Racers: moves, captures and observer replays of the hidden deck.

use serde_json::{Value, json};
use strictly_reveal::{Engine, EngineConfig};
use strictly_reveal_games::games::Racers;
use strictly_reveal_games::games::racers::CLASSIC_DECK;

fn engine(game: Racers) -> Engine<Racers> {
    Engine::with_config(game, EngineConfig::new().with_verify_consistency(true))
}

fn step(engine: &Engine<Racers>, state: &Value, action: Value) -> Value {
    engine.play(state, &action).unwrap().into_state()
}

#[test]
fn test_move_advances_pawn_and_turn() {
    let engine = engine(Racers::with_deck(CLASSIC_DECK));
    let s0 = step(&engine, &json!({}), json!("start"));
    let s1 = step(&engine, &s0, json!({"move": {"pawn": 0}}));
    assert_eq!(s1["pawns"], json!([[2, 0], [0, 0]]));
    assert_eq!(s1["player"], 1);

    let s2 = step(&engine, &s1, json!({"move": {"pawn": 1}}));
    assert_eq!(s2["pawns"], json!([[2, 0], [0, 3]]));
    assert_eq!(s2["player"], 0);
}

#[test]
fn test_capture_sends_opponent_back_to_start() {
    let engine = engine(Racers::with_deck([2, 2, 5]));
    let s0 = step(&engine, &json!({}), json!("start"));
    let s1 = step(&engine, &s0, json!({"move": {"pawn": 0}}));
    let s2 = step(&engine, &s1, json!({"move": {"pawn": 1}}));
    assert_eq!(s2["pawns"], json!([[0, 0], [0, 2]]));
}

#[test]
fn test_move_wire_snapshot() {
    let engine = engine(Racers::with_deck(CLASSIC_DECK));
    let s0 = step(&engine, &json!({}), json!("start"));
    let played = engine.play(&s0, &json!({"move": {"pawn": 0}})).unwrap();

    assert_eq!(
        serde_json::to_value(played.reveal().unwrap()).unwrap(),
        json!([[
            {"op": "set", "path": ["deckSize"], "value": 9},
            {"op": "set", "path": ["revealedCard"], "value": 2}
        ]])
    );
}

#[test]
fn test_observer_follows_whole_race() {
    let engine = engine(Racers::seeded(99));
    let mut state = json!({});
    let mut view = engine.filter(&state, None).unwrap();

    let mut actions = vec![json!("start")];
    actions.extend((0..10).map(|i| json!({"move": {"pawn": i % 2}})));

    for action in actions {
        let played = engine.play(&state, &action).unwrap();
        view = engine
            .replay(&view, &action, played.reveal().unwrap())
            .unwrap();
        state = played.into_state();
        assert_eq!(view, engine.filter(&state, None).unwrap());
        assert!(view.get("deck").is_none());
    }
    assert_eq!(view["deckSize"], 0);
}

#[test]
fn test_seeded_shuffles_repeat() {
    let first = step(&engine(Racers::seeded(7)), &json!({}), json!("start"));
    let second = step(&engine(Racers::seeded(7)), &json!({}), json!("start"));
    assert_eq!(first["deck"], second["deck"]);

    let mut sorted: Vec<u64> = serde_json::from_value(first["deck"].clone()).unwrap();
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=10).collect::<Vec<_>>());
}

#[test]
fn test_exhausted_deck_is_game_error() {
    let engine = engine(Racers::with_deck([1]));
    let s0 = step(&engine, &json!({}), json!("start"));
    let s1 = step(&engine, &s0, json!({"move": {"pawn": 0}}));
    let err = engine.play(&s1, &json!({"move": {"pawn": 0}})).unwrap_err();
    assert!(err.to_string().contains("exhausted"));
}

#[test]
fn test_invalid_pawn_is_rejected() {
    let engine = engine(Racers::with_deck(CLASSIC_DECK));
    let s0 = step(&engine, &json!({}), json!("start"));
    let err = engine.play(&s0, &json!({"move": {"pawn": 2}})).unwrap_err();
    assert!(err.to_string().contains("No pawn 2"));
}
