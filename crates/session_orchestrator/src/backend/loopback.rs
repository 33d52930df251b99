//! In-memory session backend for tests and in-process development.
//!
//! All instances attached to the same [`LoopbackWorld`] observe each other's
//! advertised sessions; the world stands in for a LAN segment or a hosted
//! service depending on the identity each instance was built with.
//! Completions are pushed into the sink during the call itself; the
//! orchestrator still observes them on its next pump, so the ordering
//! contract matches a real asynchronous provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use session_shared::config::{AdvertisingMode, SessionConfig, SessionSearchQuery};
use session_shared::events::{
    BackendCompletion, BackendError, CompletionSender, JoinResult, OperationKind,
};
use session_shared::ids::{BackendIdentity, SessionHandle, SessionName};
use session_shared::search::{SessionSearchResult, ATTR_MATCH_TAG};

use super::SessionBackend;

/// Shared registry standing in for the reachable network.
#[derive(Clone, Default)]
pub struct LoopbackWorld {
    inner: Arc<Mutex<WorldState>>,
}

#[derive(Default)]
struct WorldState {
    sessions: HashMap<u64, AdvertisedSession>,
}

struct AdvertisedSession {
    handle: SessionHandle,
    name: SessionName,
    owner: String,
    config: SessionConfig,
    player_count: u16,
    started: bool,
}

impl LoopbackWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently advertised sessions.
    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    /// Player count of the session behind `handle`, if it still exists.
    pub fn player_count(&self, handle: SessionHandle) -> Option<u16> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(&handle.get())
            .map(|session| session.player_count)
    }

    /// Whether the session behind `handle` has been started.
    pub fn is_started(&self, handle: SessionHandle) -> Option<bool> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(&handle.get())
            .map(|session| session.started)
    }
}

/// Failure-injection controls for one loopback instance.
#[derive(Clone, Default)]
pub struct LoopbackControls {
    inner: Arc<Mutex<ControlState>>,
}

#[derive(Default)]
struct ControlState {
    reject_next: Vec<OperationKind>,
    fail_next: Vec<OperationKind>,
}

impl LoopbackControls {
    /// The next call of `kind` is rejected synchronously.
    pub fn reject_next(&self, kind: OperationKind) {
        self.inner.lock().unwrap().reject_next.push(kind);
    }

    /// The next call of `kind` is accepted but completes with failure.
    pub fn fail_next(&self, kind: OperationKind) {
        self.inner.lock().unwrap().fail_next.push(kind);
    }

    fn take_reject(&self, kind: OperationKind) -> bool {
        take(&mut self.inner.lock().unwrap().reject_next, kind)
    }

    fn take_fail(&self, kind: OperationKind) -> bool {
        take(&mut self.inner.lock().unwrap().fail_next, kind)
    }
}

fn take(list: &mut Vec<OperationKind>, kind: OperationKind) -> bool {
    match list.iter().position(|entry| *entry == kind) {
        Some(position) => {
            list.remove(position);
            true
        }
        None => false,
    }
}

/// In-memory [`SessionBackend`] over a shared [`LoopbackWorld`].
pub struct LoopbackSessionBackend {
    identity: BackendIdentity,
    owner: String,
    world: LoopbackWorld,
    controls: LoopbackControls,
    sink: Option<CompletionSender>,
    hosting: Option<SessionHandle>,
    joined: Option<SessionHandle>,
}

impl LoopbackSessionBackend {
    /// Builds a backend attached to `world`, along with its failure controls.
    pub fn new(
        world: LoopbackWorld,
        identity: BackendIdentity,
        owner: impl Into<String>,
    ) -> (Self, LoopbackControls) {
        let controls = LoopbackControls::default();
        let backend = Self {
            identity,
            owner: owner.into(),
            world,
            controls: controls.clone(),
            sink: None,
            hosting: None,
            joined: None,
        };
        (backend, controls)
    }

    fn deliver(&self, completion: BackendCompletion) {
        match &self.sink {
            Some(sink) => {
                let _ = sink.send(completion);
            }
            None => debug!(target: "session::loopback", "dropping completion, no sink installed"),
        }
    }

    fn scripted_rejection(&self, kind: OperationKind) -> Result<(), BackendError> {
        if self.controls.take_reject(kind) {
            return Err(BackendError::Rejected(format!("scripted rejection of {kind}")));
        }
        Ok(())
    }

    fn scripted_failure(&self, kind: OperationKind) -> bool {
        self.controls.take_fail(kind)
    }
}

impl SessionBackend for LoopbackSessionBackend {
    fn identity(&self) -> BackendIdentity {
        self.identity.clone()
    }

    fn set_completion_sink(&mut self, sink: CompletionSender) {
        self.sink = Some(sink);
    }

    fn has_session(&self, name: SessionName) -> bool {
        let state = self.world.inner.lock().unwrap();
        self.hosting
            .into_iter()
            .chain(self.joined)
            .any(|handle| {
                state
                    .sessions
                    .get(&handle.get())
                    .is_some_and(|session| session.name == name)
            })
    }

    fn create_session(
        &mut self,
        name: SessionName,
        config: &SessionConfig,
    ) -> Result<(), BackendError> {
        self.scripted_rejection(OperationKind::Create)?;
        if self.scripted_failure(OperationKind::Create) {
            self.deliver(BackendCompletion::Create { name, success: false });
            return Ok(());
        }

        let handle = SessionHandle::mint();
        {
            let mut state = self.world.inner.lock().unwrap();
            state.sessions.insert(
                handle.get(),
                AdvertisedSession {
                    handle,
                    name,
                    owner: self.owner.clone(),
                    config: config.clone(),
                    player_count: 0,
                    started: false,
                },
            );
        }
        self.hosting = Some(handle);
        debug!(target: "session::loopback", %name, owner = %self.owner, %handle, "session advertised");
        self.deliver(BackendCompletion::Create { name, success: true });
        Ok(())
    }

    fn find_sessions(&mut self, query: &SessionSearchQuery) -> Result<(), BackendError> {
        self.scripted_rejection(OperationKind::Find)?;
        if query.max_results == 0 {
            return Err(BackendError::InvalidQuery("max_results must be positive"));
        }
        if self.scripted_failure(OperationKind::Find) {
            self.deliver(BackendCompletion::Find {
                results: Vec::new(),
                success: false,
            });
            return Ok(());
        }

        let results: Vec<SessionSearchResult> = {
            let state = self.world.inner.lock().unwrap();
            state
                .sessions
                .values()
                .filter(|session| {
                    !query.lan_only || session.config.advertising == AdvertisingMode::Lan
                })
                .take(query.max_results as usize)
                .map(|session| {
                    let max_slots = session.config.max_public_slots.min(u16::MAX as u32) as u16;
                    let mut result =
                        SessionSearchResult::new(session.handle, session.owner.clone(), max_slots);
                    result.player_count = session.player_count;
                    result
                        .attributes
                        .insert(ATTR_MATCH_TAG.to_owned(), session.config.match_tag.clone());
                    result
                })
                .collect()
        };
        // Empty result sets are still a backend-level success; the caller
        // decides how to report them.
        self.deliver(BackendCompletion::Find {
            results,
            success: true,
        });
        Ok(())
    }

    fn join_session(
        &mut self,
        name: SessionName,
        target: &SessionSearchResult,
    ) -> Result<(), BackendError> {
        self.scripted_rejection(OperationKind::Join)?;
        if self.scripted_failure(OperationKind::Join) {
            self.deliver(BackendCompletion::Join {
                name,
                result: JoinResult::UnknownError,
                resolved_address: None,
            });
            return Ok(());
        }

        if self.hosting.is_some() || self.joined.is_some() {
            self.deliver(BackendCompletion::Join {
                name,
                result: JoinResult::AlreadyInSession,
                resolved_address: None,
            });
            return Ok(());
        }

        let (result, resolved_address) = {
            let mut state = self.world.inner.lock().unwrap();
            match state.sessions.get_mut(&target.handle.get()) {
                None => (JoinResult::SessionDoesNotExist, None),
                Some(session) if session.player_count as u32 >= session.config.max_public_slots => {
                    (JoinResult::SessionIsFull, None)
                }
                Some(session) => {
                    session.player_count += 1;
                    let address = format!("loopback://{}/{}", session.owner, session.handle);
                    (JoinResult::Success, Some(address))
                }
            }
        };
        if result.is_success() {
            self.joined = Some(target.handle);
        }
        debug!(target: "session::loopback", %name, %result, "join processed");
        self.deliver(BackendCompletion::Join {
            name,
            result,
            resolved_address,
        });
        Ok(())
    }

    fn destroy_session(&mut self, name: SessionName) -> Result<(), BackendError> {
        self.scripted_rejection(OperationKind::Destroy)?;
        if self.scripted_failure(OperationKind::Destroy) {
            self.deliver(BackendCompletion::Destroy { name, success: false });
            return Ok(());
        }

        {
            let mut state = self.world.inner.lock().unwrap();
            if let Some(handle) = self.hosting.take() {
                state.sessions.remove(&handle.get());
                debug!(target: "session::loopback", %name, %handle, "hosted session withdrawn");
            } else if let Some(handle) = self.joined.take() {
                if let Some(session) = state.sessions.get_mut(&handle.get()) {
                    session.player_count = session.player_count.saturating_sub(1);
                }
            }
        }
        // Teardown is idempotent at the backend level.
        self.deliver(BackendCompletion::Destroy { name, success: true });
        Ok(())
    }

    fn start_session(&mut self, name: SessionName) -> Result<(), BackendError> {
        self.scripted_rejection(OperationKind::Start)?;
        if self.scripted_failure(OperationKind::Start) {
            self.deliver(BackendCompletion::Start { name, success: false });
            return Ok(());
        }

        let success = {
            let mut state = self.world.inner.lock().unwrap();
            match self
                .hosting
                .and_then(|handle| state.sessions.get_mut(&handle.get()))
            {
                Some(session) => {
                    session.started = true;
                    true
                }
                None => false,
            }
        };
        self.deliver(BackendCompletion::Start { name, success });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_shared::ids::GAME_SESSION;
    use tokio::sync::mpsc;

    fn wired(
        world: &LoopbackWorld,
        owner: &str,
    ) -> (
        LoopbackSessionBackend,
        LoopbackControls,
        mpsc::UnboundedReceiver<BackendCompletion>,
    ) {
        let (mut backend, controls) =
            LoopbackSessionBackend::new(world.clone(), BackendIdentity::local(), owner);
        let (sink, completions) = mpsc::unbounded_channel();
        backend.set_completion_sink(sink);
        (backend, controls, completions)
    }

    #[test]
    fn advertised_session_is_visible_to_other_instances() {
        let world = LoopbackWorld::new();
        let (mut host, _, mut host_rx) = wired(&world, "host");
        let (mut searcher, _, mut search_rx) = wired(&world, "searcher");

        let config = SessionConfig::advertised(4, "Deathmatch", AdvertisingMode::Lan);
        host.create_session(GAME_SESSION, &config).unwrap();
        assert!(matches!(
            host_rx.try_recv().unwrap(),
            BackendCompletion::Create { success: true, .. }
        ));
        assert!(host.has_session(GAME_SESSION));

        searcher
            .find_sessions(&SessionSearchQuery::lobbies(10, true))
            .unwrap();
        match search_rx.try_recv().unwrap() {
            BackendCompletion::Find { results, success } => {
                assert!(success);
                assert_eq!(results.len(), 1);
                assert_eq!(results[0].match_tag(), Some("Deathmatch"));
                assert_eq!(results[0].owner, "host");
            }
            other => panic!("expected find completion, got {other:?}"),
        }
    }

    #[test]
    fn join_fills_slots_until_session_is_full() {
        let world = LoopbackWorld::new();
        let (mut host, _, _host_rx) = wired(&world, "host");
        let config = SessionConfig::advertised(1, "Duel", AdvertisingMode::Lan);
        host.create_session(GAME_SESSION, &config).unwrap();

        let (mut searcher, _, mut rx) = wired(&world, "searcher");
        searcher
            .find_sessions(&SessionSearchQuery::lobbies(10, true))
            .unwrap();
        let target = match rx.try_recv().unwrap() {
            BackendCompletion::Find { results, .. } => results.into_iter().next().unwrap(),
            other => panic!("expected find completion, got {other:?}"),
        };

        searcher.join_session(GAME_SESSION, &target).unwrap();
        match rx.try_recv().unwrap() {
            BackendCompletion::Join {
                result,
                resolved_address,
                ..
            } => {
                assert_eq!(result, JoinResult::Success);
                assert!(resolved_address.unwrap().starts_with("loopback://host/"));
            }
            other => panic!("expected join completion, got {other:?}"),
        }

        let (mut latecomer, _, mut late_rx) = wired(&world, "latecomer");
        latecomer.join_session(GAME_SESSION, &target).unwrap();
        assert!(matches!(
            late_rx.try_recv().unwrap(),
            BackendCompletion::Join {
                result: JoinResult::SessionIsFull,
                ..
            }
        ));
    }

    #[test]
    fn scripted_rejection_produces_no_completion() {
        let world = LoopbackWorld::new();
        let (mut backend, controls, mut rx) = wired(&world, "host");
        controls.reject_next(OperationKind::Create);

        let config = SessionConfig::advertised(4, "Coop", AdvertisingMode::Lan);
        let err = backend.create_session(GAME_SESSION, &config).unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
        assert!(rx.try_recv().is_err());
        assert_eq!(world.session_count(), 0);
    }

    #[test]
    fn zero_max_results_is_an_invalid_query() {
        let world = LoopbackWorld::new();
        let (mut backend, _, _rx) = wired(&world, "searcher");
        let err = backend
            .find_sessions(&SessionSearchQuery::lobbies(0, true))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidQuery(_)));
    }
}
