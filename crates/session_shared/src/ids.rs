//! Strongly typed identifiers for sessions and backends.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier a backend mints for an advertised session.
///
/// Only meaningful to the backend that produced it; the orchestrator and
/// consumers treat it as a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Mints a process-unique handle. Monotonic, not guess-resistant.
    pub fn mint() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Well-known name under which the active session is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionName(&'static str);

/// The single session name used by the matchmaking flow.
pub const GAME_SESSION: SessionName = SessionName::new("game_session");

impl SessionName {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Identity name local/offline providers report, toggling LAN behavior.
pub const LOCAL_IDENTITY: &str = "lan";

/// Runtime-queryable name of a session provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendIdentity(String);

impl BackendIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identity of the local/LAN provider.
    pub fn local() -> Self {
        Self(LOCAL_IDENTITY.to_owned())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Local providers advertise over LAN instead of a hosted service.
    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_IDENTITY
    }
}

impl fmt::Display for BackendIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_handles_are_unique() {
        let a = SessionHandle::mint();
        let b = SessionHandle::mint();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn local_identity_detection() {
        assert!(BackendIdentity::local().is_local());
        assert!(!BackendIdentity::new("steam").is_local());
    }
}
