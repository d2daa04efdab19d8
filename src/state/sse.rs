use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-session broadcast hubs carved out from [`AppState`](super::AppState).
pub struct SessionHubs {
    hubs: DashMap<Uuid, Arc<SseHub>>,
    capacity: usize,
}

impl SessionHubs {
    /// Hubs are created lazily, each with `capacity` buffered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Hub for `session_id`, created on first use.
    pub fn hub(&self, session_id: Uuid) -> Arc<SseHub> {
        self.hubs
            .entry(session_id)
            .or_insert_with(|| Arc::new(SseHub::new(self.capacity)))
            .clone()
    }

    /// Hub for `session_id` if some subscriber created one.
    pub fn existing(&self, session_id: Uuid) -> Option<Arc<SseHub>> {
        self.hubs.get(&session_id).map(|entry| entry.value().clone())
    }

    /// Drop the hub of a session; open streams end once they drain.
    pub fn remove(&self, session_id: Uuid) {
        self.hubs.remove(&session_id);
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hubs_are_shared_per_session() {
        let hubs = SessionHubs::new(4);
        let session = Uuid::new_v4();
        let mut rx = hubs.hub(session).subscribe();
        let mut other = hubs.hub(Uuid::new_v4()).subscribe();

        hubs.hub(session)
            .broadcast(ServerEvent::new(Some("info".into()), "hello".into()));

        assert_eq!(rx.recv().await.unwrap().data, "hello");
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn removed_hubs_are_not_recreated_by_lookups() {
        let hubs = SessionHubs::new(4);
        let session = Uuid::new_v4();
        assert!(hubs.existing(session).is_none());

        hubs.hub(session);
        assert!(hubs.existing(session).is_some());
        hubs.remove(session);
        assert!(hubs.existing(session).is_none());
    }
}
