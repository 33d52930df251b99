//! Session and search configuration, built fresh per operation attempt.

use serde::{Deserialize, Serialize};
use strum::Display;

/// How a session is advertised to searchers.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum AdvertisingMode {
    Lan,
    Hosted,
}

/// Settings submitted to the backend for one create attempt.
///
/// Immutable once issued; a retry builds a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_public_slots: u32,
    pub match_tag: String,
    pub advertising: AdvertisingMode,
    pub join_in_progress: bool,
    pub uses_presence: bool,
    pub prefer_lobbies: bool,
}

impl SessionConfig {
    /// Builds the advertised configuration for a create attempt.
    ///
    /// Late joins, presence and lobby preference are fixed policy here, not
    /// caller-configurable.
    pub fn advertised(
        max_public_slots: u32,
        match_tag: impl Into<String>,
        advertising: AdvertisingMode,
    ) -> Self {
        Self {
            max_public_slots,
            match_tag: match_tag.into(),
            advertising,
            join_in_progress: true,
            uses_presence: true,
            prefer_lobbies: true,
        }
    }
}

/// Criteria for one session search; discarded once the search completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSearchQuery {
    pub max_results: u32,
    pub lan_only: bool,
    pub lobbies_only: bool,
}

impl SessionSearchQuery {
    /// Lobby-scoped search; `lan_only` mirrors the backend identity.
    pub fn lobbies(max_results: u32, lan_only: bool) -> Self {
        Self {
            max_results,
            lan_only,
            lobbies_only: true,
        }
    }
}
