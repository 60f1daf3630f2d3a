//! Filter registry: per-observer projections of the authoritative state.
//!
//! A game supplies its filters through [`GameDefinition::filters`]. The engine
//! resolves them once per top-level invocation into a [`ResolvedFilters`],
//! which stays fixed until that invocation returns.

use crate::error::EngineError;
use crate::game::GameDefinition;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};

/// Key under which a single anonymous filter is stored.
pub const DEFAULT_FILTER_KEY: &str = "default";

type ProjectFn = dyn Fn(&mut Value) + Send + Sync;

/// A deterministic projection from full state to an observer's view.
///
/// The wrapped function edits a private copy of the state in place, usually
/// by deleting keys. It must not introduce information that the state lacks.
pub struct Filter(Box<ProjectFn>);

impl Filter {
    /// Wraps a projection function.
    pub fn new(project: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        Self(Box::new(project))
    }

    /// Filter that hides nothing.
    pub fn identity() -> Self {
        Self::new(|_| {})
    }

    /// Filter that removes the given top-level keys.
    pub fn hide_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        Self::new(move |state| {
            if let Some(map) = state.as_object_mut() {
                for key in &keys {
                    map.remove(key);
                }
            }
        })
    }

    /// Returns the filtered view of `state`, leaving `state` untouched.
    pub fn project(&self, state: &Value) -> Value {
        let mut view = state.clone();
        (self.0)(&mut view);
        view
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}

/// Filters returned by a game definition.
#[derive(Debug)]
pub enum Filters {
    /// One anonymous filter applied to every observer.
    Single(Filter),
    /// Named filters, typically one per player.
    Multi(BTreeMap<String, Filter>),
}

impl Filters {
    /// Single identity filter: full visibility.
    pub fn unfiltered() -> Self {
        Filters::Single(Filter::identity())
    }

    /// Single anonymous filter.
    pub fn single(project: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        Filters::Single(Filter::new(project))
    }

    /// Named filters from `(key, filter)` pairs.
    pub fn multi<I, K>(filters: I) -> Self
    where
        I: IntoIterator<Item = (K, Filter)>,
        K: Into<String>,
    {
        Filters::Multi(filters.into_iter().map(|(k, f)| (k.into(), f)).collect())
    }
}

impl Default for Filters {
    fn default() -> Self {
        Self::unfiltered()
    }
}

/// Whether the game supplied one anonymous filter or a keyed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum FilterMode {
    /// One filter, stored under [`DEFAULT_FILTER_KEY`].
    #[display("single")]
    Single,
    /// Keyed filters, keys preserved verbatim.
    #[display("multi")]
    Multi,
}

/// Filters normalized for one top-level invocation.
#[derive(Debug)]
pub struct ResolvedFilters {
    mode: FilterMode,
    filters: BTreeMap<String, Filter>,
}

impl ResolvedFilters {
    /// Normalizes the filters a game returned.
    pub fn from_filters(filters: Filters) -> Self {
        match filters {
            Filters::Single(filter) => Self {
                mode: FilterMode::Single,
                filters: BTreeMap::from([(DEFAULT_FILTER_KEY.to_string(), filter)]),
            },
            Filters::Multi(filters) => Self {
                mode: FilterMode::Multi,
                filters,
            },
        }
    }

    /// Returns the resolution mode.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if a multi-mode game supplied no filters at all.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Iterates `(key, filter)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.filters.iter().map(|(k, f)| (k.as_str(), f))
    }

    /// Looks up the filter for an observer.
    ///
    /// In single mode the key is ignored. In multi mode it is required.
    pub fn get(&self, key: Option<&str>) -> Result<&Filter, EngineError> {
        let lookup = match self.mode {
            FilterMode::Single => DEFAULT_FILTER_KEY,
            FilterMode::Multi => key.ok_or(EngineError::UnknownFilter(None))?,
        };
        self.filters
            .get(lookup)
            .ok_or_else(|| EngineError::UnknownFilter(key.map(str::to_string)))
    }

    /// Projects `state` through every filter.
    pub fn project_all(&self, state: &Value) -> BTreeMap<String, Value> {
        self.filters
            .iter()
            .map(|(key, filter)| (key.clone(), filter.project(state)))
            .collect()
    }
}

/// Resolves the game's filters for `state`.
#[instrument(skip(game, state))]
pub fn resolve<G: GameDefinition + ?Sized>(game: &G, state: &Value) -> ResolvedFilters {
    let resolved = ResolvedFilters::from_filters(game.filters(state));
    debug!(
        mode = %resolved.mode(),
        filters = resolved.len(),
        "Resolved filters"
    );
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_projection_is_unchanged() {
        let state = json!({"hi": "bye", "n": [1, 2]});
        assert_eq!(Filter::identity().project(&state), state);
    }

    #[test]
    fn test_projection_leaves_source_untouched() {
        let state = json!({"doors": {"1": "goat"}, "openDoors": {}});
        let view = Filter::hide_keys(["doors"]).project(&state);
        assert_eq!(view, json!({"openDoors": {}}));
        assert_eq!(state["doors"]["1"], "goat");
    }

    #[test]
    fn test_single_mode_uses_default_key() {
        let resolved = ResolvedFilters::from_filters(Filters::unfiltered());
        assert_eq!(resolved.mode(), FilterMode::Single);
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec![DEFAULT_FILTER_KEY]);
        assert!(resolved.get(None).is_ok());
        assert!(resolved.get(Some("anything")).is_ok());
    }

    #[test]
    fn test_multi_mode_preserves_keys() {
        let resolved = ResolvedFilters::from_filters(Filters::multi([
            ("b", Filter::hide_keys(["a"])),
            ("a", Filter::hide_keys(["b"])),
        ]));
        assert_eq!(resolved.mode(), FilterMode::Multi);
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(resolved.get(Some("a")).is_ok());
        assert_eq!(
            resolved.get(Some("c")).unwrap_err(),
            EngineError::UnknownFilter(Some("c".to_string()))
        );
        assert_eq!(
            resolved.get(None).unwrap_err(),
            EngineError::UnknownFilter(None)
        );
    }

    #[test]
    fn test_project_all() {
        let resolved = ResolvedFilters::from_filters(Filters::multi([
            ("a", Filter::hide_keys(["b"])),
            ("b", Filter::hide_keys(["a"])),
        ]));
        let views = resolved.project_all(&json!({"a": 1, "b": 2}));
        assert_eq!(views["a"], json!({"a": 1}));
        assert_eq!(views["b"], json!({"b": 2}));
    }
}
