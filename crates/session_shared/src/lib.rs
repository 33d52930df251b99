//! Shared session-lifecycle types for the matchmaking layer.
//!
//! This crate hosts the data model shared between the orchestrator and
//! concrete session backends:
//! - config: session settings and search criteria, built fresh per attempt
//! - search: advertised search results and attribute helpers
//! - events: completion messages, bus payloads, backend error taxonomy
//! - ids: strongly typed identifiers (session handle/name, backend identity)
//!
//! Keep this crate lean: no orchestration logic, no transport.

pub mod config;
pub mod events;
pub mod ids;
pub mod search;

/// Convenience prelude for downstream crates.
pub mod prelude {
    pub use crate::config::{AdvertisingMode, SessionConfig, SessionSearchQuery};
    pub use crate::events::{
        BackendCompletion, BackendError, CompletionSender, CreateComplete, DestroyComplete,
        FindComplete, JoinComplete, JoinResult, OperationKind, StartComplete,
    };
    pub use crate::ids::{BackendIdentity, SessionHandle, SessionName, GAME_SESSION};
    pub use crate::search::{select_by_tag, SessionSearchResult, ATTR_MATCH_TAG};
}
