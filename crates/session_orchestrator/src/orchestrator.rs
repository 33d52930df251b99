//! The session-lifecycle state machine.
//!
//! Every operation follows the same protocol: validate backend availability,
//! arm the per-kind subscription slot, issue the backend call, and either
//! publish a synthetic failure synchronously (rejection path, slot cleared
//! immediately) or wait for the backend's completion, which
//! [`SessionOrchestrator::pump`] turns into exactly one bus event while
//! clearing the slot.

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use session_shared::config::{AdvertisingMode, SessionConfig, SessionSearchQuery};
use session_shared::events::{
    BackendCompletion, CreateComplete, DestroyComplete, FindComplete, JoinComplete, JoinResult,
    OperationKind, StartComplete,
};
use session_shared::ids::{SessionName, GAME_SESSION};
use session_shared::search::{select_by_tag, SessionSearchResult};

use crate::backend::SessionBackend;
use crate::bus::{NotificationBus, DEFAULT_BUS_CAPACITY};
use crate::travel::TravelHandler;

/// Errors returned directly to the caller. Everything else surfaces as a
/// failure event on the bus.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Another operation of the same kind is still in flight. The duplicate
    /// was never issued, so no event is published for it.
    #[error("a {0} operation is already pending")]
    OperationPending(OperationKind),
}

/// Static orchestrator configuration.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Well-known name the active session is registered under.
    pub session_name: SessionName,
    /// Destination path handed to the travel layer after hosting.
    pub lobby_destination: String,
    /// Per-channel buffer of the notification bus.
    pub bus_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            session_name: GAME_SESSION,
            lobby_destination: "/maps/lobby".to_owned(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

/// Opaque token for one issued operation; `Some` in the table marks the
/// slot active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpTicket(u64);

#[derive(Default)]
struct SlotTable {
    slots: [Option<OpTicket>; OperationKind::COUNT],
    next_ticket: u64,
}

impl SlotTable {
    fn is_active(&self, kind: OperationKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    fn arm(&mut self, kind: OperationKind) -> OpTicket {
        self.next_ticket += 1;
        let ticket = OpTicket(self.next_ticket);
        self.slots[kind.index()] = Some(ticket);
        ticket
    }

    fn clear(&mut self, kind: OperationKind) -> Option<OpTicket> {
        self.slots[kind.index()].take()
    }
}

/// Coordinates the session lifecycle against a pluggable backend.
///
/// Single-threaded by design: operations and [`pump`](Self::pump) are meant
/// to run on the host application's main execution context. Backends may
/// complete from worker threads; the completion channel fences those back
/// onto the pumping thread.
pub struct SessionOrchestrator {
    config: OrchestratorConfig,
    backend: Option<Box<dyn SessionBackend>>,
    bus: NotificationBus,
    completions: mpsc::UnboundedReceiver<BackendCompletion>,
    slots: SlotTable,
    active_session: Option<SessionName>,
    last_config: Option<SessionConfig>,
    last_results: Vec<SessionSearchResult>,
    travel: Option<Box<dyn TravelHandler>>,
}

impl SessionOrchestrator {
    /// Builds an orchestrator around an optional backend. `None` models a
    /// platform with no session provider configured; every operation then
    /// fails fast with a failure event and no backend round-trip.
    pub fn new(config: OrchestratorConfig, mut backend: Option<Box<dyn SessionBackend>>) -> Self {
        let (sink, completions) = mpsc::unbounded_channel();
        if let Some(backend) = backend.as_mut() {
            backend.set_completion_sink(sink);
        }
        let bus = NotificationBus::new(config.bus_capacity);
        Self {
            config,
            backend,
            bus,
            completions,
            slots: SlotTable::default(),
            active_session: None,
            last_config: None,
            last_results: Vec::new(),
            travel: None,
        }
    }

    /// Installs the travel layer invoked after successful host/join.
    pub fn with_travel(mut self, travel: Box<dyn TravelHandler>) -> Self {
        self.travel = Some(travel);
        self
    }

    /// Whether an operation of `kind` is currently in flight.
    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.slots.is_active(kind)
    }

    /// Name of the session this instance currently hosts or has joined.
    pub fn active_session(&self) -> Option<SessionName> {
        self.active_session
    }

    /// Configuration submitted with the most recent create attempt.
    pub fn last_config(&self) -> Option<&SessionConfig> {
        self.last_config.as_ref()
    }

    /// Results of the most recently completed search.
    pub fn last_results(&self) -> &[SessionSearchResult] {
        &self.last_results
    }

    /// First cached search result advertising `tag`.
    pub fn select_result(&self, tag: &str) -> Option<&SessionSearchResult> {
        select_by_tag(&self.last_results, tag)
    }

    pub fn subscribe_create(&self) -> broadcast::Receiver<CreateComplete> {
        self.bus.subscribe_create()
    }

    pub fn subscribe_find(&self) -> broadcast::Receiver<FindComplete> {
        self.bus.subscribe_find()
    }

    pub fn subscribe_join(&self) -> broadcast::Receiver<JoinComplete> {
        self.bus.subscribe_join()
    }

    pub fn subscribe_destroy(&self) -> broadcast::Receiver<DestroyComplete> {
        self.bus.subscribe_destroy()
    }

    pub fn subscribe_start(&self) -> broadcast::Receiver<StartComplete> {
        self.bus.subscribe_start()
    }

    /// Advertises a new session under the well-known name.
    ///
    /// The advertising mode follows the backend identity (local ⇒ LAN). A
    /// leftover session under the same name is destroyed first, best-effort
    /// and without blocking the new create.
    pub fn create_session(
        &mut self,
        max_public_slots: u32,
        match_tag: &str,
    ) -> Result<(), SessionError> {
        self.guard(OperationKind::Create)?;

        let name = self.config.session_name;
        let Some(backend) = self.backend.as_mut() else {
            warn!(target: "session::orchestrator", %name, "create: no session backend available");
            self.bus.publish_create(CreateComplete { success: false });
            return Ok(());
        };

        if backend.has_session(name) {
            // Fire-and-forget teardown; its completion is dropped by the
            // slot guard in pump().
            if let Err(err) = backend.destroy_session(name) {
                warn!(target: "session::orchestrator", %name, "pre-create destroy rejected: {err}");
            }
        }

        let mode = if backend.identity().is_local() {
            AdvertisingMode::Lan
        } else {
            AdvertisingMode::Hosted
        };
        let config = SessionConfig::advertised(max_public_slots, match_tag, mode);

        self.slots.arm(OperationKind::Create);
        let issued = backend.create_session(name, &config);
        self.last_config = Some(config);
        if let Err(err) = issued {
            warn!(target: "session::orchestrator", %name, "create rejected synchronously: {err}");
            self.slots.clear(OperationKind::Create);
            self.bus.publish_create(CreateComplete { success: false });
        }
        Ok(())
    }

    /// Searches for advertised lobby sessions. LAN-only when the backend
    /// identity is local.
    pub fn find_sessions(&mut self, max_results: u32) -> Result<(), SessionError> {
        self.guard(OperationKind::Find)?;

        let Some(backend) = self.backend.as_mut() else {
            warn!(target: "session::orchestrator", "find: no session backend available");
            self.bus.publish_find(FindComplete {
                results: Vec::new(),
                success: false,
            });
            return Ok(());
        };

        let query = SessionSearchQuery::lobbies(max_results, backend.identity().is_local());
        self.slots.arm(OperationKind::Find);
        if let Err(err) = backend.find_sessions(&query) {
            warn!(target: "session::orchestrator", "find rejected synchronously: {err}");
            self.slots.clear(OperationKind::Find);
            self.bus.publish_find(FindComplete {
                results: Vec::new(),
                success: false,
            });
        }
        Ok(())
    }

    /// Joins the session behind a previously found search result. The
    /// backend's join result code is published unmodified.
    pub fn join_session(&mut self, target: &SessionSearchResult) -> Result<(), SessionError> {
        self.guard(OperationKind::Join)?;

        let name = self.config.session_name;
        let Some(backend) = self.backend.as_mut() else {
            warn!(target: "session::orchestrator", %name, "join: no session backend available");
            self.bus.publish_join(JoinComplete {
                result: JoinResult::UnknownError,
            });
            return Ok(());
        };

        self.slots.arm(OperationKind::Join);
        if let Err(err) = backend.join_session(name, target) {
            warn!(target: "session::orchestrator", %name, "join rejected synchronously: {err}");
            self.slots.clear(OperationKind::Join);
            self.bus.publish_join(JoinComplete {
                result: JoinResult::UnknownError,
            });
        }
        Ok(())
    }

    /// Tears down the active session. With no active session this is a
    /// no-op that still reports success exactly once.
    pub fn destroy_session(&mut self) -> Result<(), SessionError> {
        self.guard(OperationKind::Destroy)?;

        if self.active_session.is_none() {
            debug!(target: "session::orchestrator", "destroy: no active session, no-op success");
            self.bus.publish_destroy(DestroyComplete { success: true });
            return Ok(());
        }

        let name = self.config.session_name;
        let Some(backend) = self.backend.as_mut() else {
            warn!(target: "session::orchestrator", %name, "destroy: no session backend available");
            self.bus.publish_destroy(DestroyComplete { success: false });
            return Ok(());
        };

        self.slots.arm(OperationKind::Destroy);
        if let Err(err) = backend.destroy_session(name) {
            warn!(target: "session::orchestrator", %name, "destroy rejected synchronously: {err}");
            self.slots.clear(OperationKind::Destroy);
            self.bus.publish_destroy(DestroyComplete { success: false });
        }
        Ok(())
    }

    /// Marks the active session as started. Late joins stay governed by the
    /// session's join-in-progress policy on the backend side.
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        self.guard(OperationKind::Start)?;

        if self.active_session.is_none() {
            warn!(target: "session::orchestrator", "start: no active session");
            self.bus.publish_start(StartComplete { success: false });
            return Ok(());
        }

        let name = self.config.session_name;
        let Some(backend) = self.backend.as_mut() else {
            warn!(target: "session::orchestrator", %name, "start: no session backend available");
            self.bus.publish_start(StartComplete { success: false });
            return Ok(());
        };

        self.slots.arm(OperationKind::Start);
        if let Err(err) = backend.start_session(name) {
            warn!(target: "session::orchestrator", %name, "start rejected synchronously: {err}");
            self.slots.clear(OperationKind::Start);
            self.bus.publish_start(StartComplete { success: false });
        }
        Ok(())
    }

    /// Drains queued backend completions on the caller's thread, publishing
    /// exactly one bus event per armed operation. Returns the number of
    /// completions that reached the bus.
    ///
    /// Completions for kinds with no armed slot (e.g. the fire-and-forget
    /// pre-create destroy) are dropped.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions.try_recv() {
            let kind = completion.kind();
            if self.slots.clear(kind).is_none() {
                debug!(target: "session::orchestrator", %kind, "dropping unsolicited completion");
                continue;
            }
            self.finish(completion);
            processed += 1;
        }
        processed
    }

    fn guard(&self, kind: OperationKind) -> Result<(), SessionError> {
        if self.slots.is_active(kind) {
            return Err(SessionError::OperationPending(kind));
        }
        Ok(())
    }

    fn finish(&mut self, completion: BackendCompletion) {
        match completion {
            BackendCompletion::Create { name, success } => {
                if success {
                    self.active_session = Some(name);
                    let destination = self.config.lobby_destination.clone();
                    if let Some(travel) = self.travel.as_mut() {
                        travel.open_destination(&destination);
                    }
                }
                debug!(target: "session::orchestrator", %name, success, "create completed");
                self.bus.publish_create(CreateComplete { success });
            }
            BackendCompletion::Find { results, success } => {
                // An empty result set is never a successful search.
                let success = success && !results.is_empty();
                debug!(target: "session::orchestrator", count = results.len(), success, "find completed");
                self.last_results = results.clone();
                self.bus.publish_find(FindComplete { results, success });
            }
            BackendCompletion::Join {
                name,
                result,
                resolved_address,
            } => {
                if result.is_success() {
                    self.active_session = Some(name);
                    match resolved_address {
                        Some(address) => {
                            if let Some(travel) = self.travel.as_mut() {
                                travel.connect_to(&address);
                            }
                        }
                        None => {
                            warn!(target: "session::orchestrator", %name, "join succeeded without a resolved address")
                        }
                    }
                }
                debug!(target: "session::orchestrator", %name, %result, "join completed");
                self.bus.publish_join(JoinComplete { result });
            }
            BackendCompletion::Destroy { name, success } => {
                if success {
                    self.active_session = None;
                }
                debug!(target: "session::orchestrator", %name, success, "destroy completed");
                self.bus.publish_destroy(DestroyComplete { success });
            }
            BackendCompletion::Start { name, success } => {
                debug!(target: "session::orchestrator", %name, success, "start completed");
                self.bus.publish_start(StartComplete { success });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_table_arms_and_clears_per_kind() {
        let mut table = SlotTable::default();
        assert!(!table.is_active(OperationKind::Create));

        let first = table.arm(OperationKind::Create);
        assert!(table.is_active(OperationKind::Create));
        assert!(!table.is_active(OperationKind::Find));

        assert_eq!(table.clear(OperationKind::Create), Some(first));
        assert_eq!(table.clear(OperationKind::Create), None);
    }

    #[test]
    fn tickets_are_monotonic_across_kinds() {
        let mut table = SlotTable::default();
        let create = table.arm(OperationKind::Create);
        let find = table.arm(OperationKind::Find);
        assert!(find.0 > create.0);
    }
}
