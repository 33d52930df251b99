//! Session-lifecycle orchestration between a UI trigger layer and a
//! pluggable network-session backend.
//!
//! The orchestrator issues create/find/join/destroy/start operations against
//! a [`SessionBackend`], guards one in-flight operation per kind, normalizes
//! backend completions and fans them out over the [`NotificationBus`].
//! Concrete providers (LAN, hosted) live behind the trait; an in-memory
//! loopback backend is included for tests and in-process development.

pub mod backend;
pub mod bus;
pub mod orchestrator;
pub mod travel;

pub use backend::loopback::{LoopbackControls, LoopbackSessionBackend, LoopbackWorld};
pub use backend::SessionBackend;
pub use bus::NotificationBus;
pub use orchestrator::{OrchestratorConfig, SessionError, SessionOrchestrator};
pub use travel::TravelHandler;
