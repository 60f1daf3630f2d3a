//! Game implementations.

pub mod cards;
pub mod doors;
pub mod racers;

pub use cards::{Cards, CardsAction};
pub use doors::{Doors, DoorsAction};
pub use racers::{Racers, RacersAction};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strictly_reveal::{Draft, EngineError, Filters, GameDefinition, GameError, Transition};
use tracing::instrument;

/// Seats used when a card table is created without explicit players.
pub const DEFAULT_SEATS: [&str; 2] = ["a", "b"];

/// Fields of an object node, or a [`GameError`] naming `what` when the node
/// holds anything else.
pub(crate) fn fields_mut<'v>(
    value: &'v mut Value,
    what: &str,
) -> Result<&'v mut Map<String, Value>, GameError> {
    value
        .as_object_mut()
        .ok_or_else(|| GameError::new(format!("{} is not an object", what)))
}

/// Names of the bundled games.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameKind {
    /// Monty Hall.
    Doors,
    /// Private hands with public hand sizes.
    Cards,
    /// Pawn race driven by a hidden deck.
    Racers,
}

/// Any bundled game, dispatched at runtime.
///
/// Lets the command line pick a game by name while the engine stays
/// statically typed over one [`GameDefinition`].
#[derive(Debug, derive_more::From)]
pub enum AnyGame {
    /// Monty Hall.
    Doors(Doors),
    /// Card shedding.
    Cards(Cards),
    /// Pawn race.
    Racers(Racers),
}

impl AnyGame {
    /// Builds a game, seeding its RNG when `seed` is given.
    #[instrument]
    pub fn new(kind: GameKind, seed: Option<u64>) -> Self {
        match (kind, seed) {
            (GameKind::Doors, Some(seed)) => Doors::seeded(seed).into(),
            (GameKind::Doors, None) => Doors::new().into(),
            (GameKind::Cards, Some(seed)) => Cards::seeded(DEFAULT_SEATS, seed).into(),
            (GameKind::Cards, None) => Cards::new(DEFAULT_SEATS).into(),
            (GameKind::Racers, Some(seed)) => Racers::seeded(seed).into(),
            (GameKind::Racers, None) => Racers::new().into(),
        }
    }

    /// Which game this is.
    pub fn kind(&self) -> GameKind {
        match self {
            AnyGame::Doors(_) => GameKind::Doors,
            AnyGame::Cards(_) => GameKind::Cards,
            AnyGame::Racers(_) => GameKind::Racers,
        }
    }

    /// State a fresh game starts from, before its setup action.
    pub fn initial_state(&self) -> Value {
        match self {
            AnyGame::Doors(game) => game.initial_state(),
            AnyGame::Cards(game) => game.initial_state(),
            AnyGame::Racers(game) => game.initial_state(),
        }
    }
}

impl GameDefinition for AnyGame {
    fn update_state(&self, draft: &mut Draft<'_>, action: &Value) -> Result<Transition, EngineError> {
        match self {
            AnyGame::Doors(game) => game.update_state(draft, action),
            AnyGame::Cards(game) => game.update_state(draft, action),
            AnyGame::Racers(game) => game.update_state(draft, action),
        }
    }

    fn filters(&self, state: &Value) -> Filters {
        match self {
            AnyGame::Doors(game) => game.filters(state),
            AnyGame::Cards(game) => game.filters(state),
            AnyGame::Racers(game) => game.filters(state),
        }
    }
}
