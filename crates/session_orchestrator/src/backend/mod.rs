//! Abstraction over concrete network-session providers.
//!
//! A backend accepts fire-and-forget calls and answers out-of-band through
//! the completion sink installed via [`SessionBackend::set_completion_sink`].
//! `Ok(())` means the call was synchronously accepted and exactly one
//! matching [`BackendCompletion`](session_shared::events::BackendCompletion)
//! will follow on the sink; `Err` means it was rejected and no completion
//! may follow.

pub mod loopback;

use session_shared::config::{SessionConfig, SessionSearchQuery};
use session_shared::events::{BackendError, CompletionSender};
use session_shared::ids::{BackendIdentity, SessionName};
use session_shared::search::SessionSearchResult;

pub trait SessionBackend: Send {
    /// Runtime identity of this provider; local identities advertise via LAN.
    fn identity(&self) -> BackendIdentity;

    /// Installs the sink completions are delivered through. The orchestrator
    /// calls this once before issuing any operation.
    fn set_completion_sink(&mut self, sink: CompletionSender);

    /// Whether a session is currently registered under `name` on this
    /// backend, hosted or joined.
    fn has_session(&self, name: SessionName) -> bool;

    /// Advertises a new session under `name`.
    fn create_session(
        &mut self,
        name: SessionName,
        config: &SessionConfig,
    ) -> Result<(), BackendError>;

    /// Searches for advertised sessions matching `query`.
    fn find_sessions(&mut self, query: &SessionSearchQuery) -> Result<(), BackendError>;

    /// Joins the session behind a previously returned search result.
    fn join_session(
        &mut self,
        name: SessionName,
        target: &SessionSearchResult,
    ) -> Result<(), BackendError>;

    /// Tears down the session registered under `name`.
    fn destroy_session(&mut self, name: SessionName) -> Result<(), BackendError>;

    /// Transitions the session registered under `name` into the started state.
    fn start_session(&mut self, name: SessionName) -> Result<(), BackendError>;
}
