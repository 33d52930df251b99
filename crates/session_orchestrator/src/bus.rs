//! Typed fan-out channels for operation completions.
//!
//! Five independent broadcast channels, one per operation kind. Subscribers
//! are optional, and a receiver only sees events published after it
//! subscribed; nothing is replayed.

use tokio::sync::broadcast;

use session_shared::events::{
    CreateComplete, DestroyComplete, FindComplete, JoinComplete, StartComplete,
};

/// Per-channel buffer; completions are rare, so small is plenty.
pub const DEFAULT_BUS_CAPACITY: usize = 16;

pub struct NotificationBus {
    create: broadcast::Sender<CreateComplete>,
    find: broadcast::Sender<FindComplete>,
    join: broadcast::Sender<JoinComplete>,
    destroy: broadcast::Sender<DestroyComplete>,
    start: broadcast::Sender<StartComplete>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (create, _) = broadcast::channel(capacity);
        let (find, _) = broadcast::channel(capacity);
        let (join, _) = broadcast::channel(capacity);
        let (destroy, _) = broadcast::channel(capacity);
        let (start, _) = broadcast::channel(capacity);
        Self {
            create,
            find,
            join,
            destroy,
            start,
        }
    }

    pub fn subscribe_create(&self) -> broadcast::Receiver<CreateComplete> {
        self.create.subscribe()
    }

    pub fn subscribe_find(&self) -> broadcast::Receiver<FindComplete> {
        self.find.subscribe()
    }

    pub fn subscribe_join(&self) -> broadcast::Receiver<JoinComplete> {
        self.join.subscribe()
    }

    pub fn subscribe_destroy(&self) -> broadcast::Receiver<DestroyComplete> {
        self.destroy.subscribe()
    }

    pub fn subscribe_start(&self) -> broadcast::Receiver<StartComplete> {
        self.start.subscribe()
    }

    // Publishing with zero subscribers is fine; the send error is dropped on
    // purpose.

    pub(crate) fn publish_create(&self, event: CreateComplete) {
        let _ = self.create.send(event);
    }

    pub(crate) fn publish_find(&self, event: FindComplete) {
        let _ = self.find.send(event);
    }

    pub(crate) fn publish_join(&self, event: JoinComplete) {
        let _ = self.join.send(event);
    }

    pub(crate) fn publish_destroy(&self, event: DestroyComplete) {
        let _ = self.destroy.send(event);
    }

    pub(crate) fn publish_start(&self, event: StartComplete) {
        let _ = self.start.send(event);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = NotificationBus::default();
        bus.publish_create(CreateComplete { success: true });
        bus.publish_destroy(DestroyComplete { success: false });
    }

    #[test]
    fn late_subscribers_receive_nothing() {
        let bus = NotificationBus::default();
        bus.publish_create(CreateComplete { success: true });
        let mut receiver = bus.subscribe_create();
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn every_subscriber_sees_the_event() {
        let bus = NotificationBus::default();
        let mut first = bus.subscribe_join();
        let mut second = bus.subscribe_join();
        bus.publish_join(JoinComplete {
            result: session_shared::events::JoinResult::SessionIsFull,
        });
        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_ok());
    }
}
