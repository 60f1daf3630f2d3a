//! Strictly Reveal Games - bundled games and session driver
//!
//! Three small hidden-information games built on the `strictly_reveal`
//! engine, plus the pieces the `strictly_reveal` binary is made of.
//!
//! # Games
//!
//! - **Doors**: Monty Hall; one door opens per action
//! - **Cards**: private hands, public hand sizes, one filter per seat
//! - **Racers**: pawn race driven by a hidden deck
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use strictly_reveal::Engine;
//! use strictly_reveal_games::games::Racers;
//!
//! let engine = Engine::new(Racers::seeded(42));
//! let started = engine.play(&json!({}), &json!("start")).unwrap();
//! let view = engine.filter(started.state(), None).unwrap();
//! assert_eq!(view["deckSize"], 10);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod demo;
pub mod games;
pub mod session;

pub use games::{AnyGame, GameKind};
pub use session::{Session, SessionId, Turn};
