use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata a client announces when it starts tracking presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PresenceMeta {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// One tracked presence socket.
#[derive(Clone)]
pub struct PresenceConnection {
    pub session_id: Uuid,
    pub meta: PresenceMeta,
    pub tx: mpsc::UnboundedSender<Message>,
    seq: u64,
}

/// Online users per session, keyed by connection so several tabs of one user coexist.
#[derive(Default)]
pub struct PresenceRegistry {
    connections: DashMap<Uuid, PresenceConnection>,
    next_seq: AtomicU64,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `connection_id` in `session_id`, replacing any earlier metadata.
    pub fn track(
        &self,
        connection_id: Uuid,
        session_id: Uuid,
        meta: PresenceMeta,
        tx: mpsc::UnboundedSender<Message>,
    ) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(
            connection_id,
            PresenceConnection {
                session_id,
                meta,
                tx,
                seq,
            },
        );
    }

    /// Stop tracking a connection, returning the session it belonged to.
    pub fn untrack(&self, connection_id: Uuid) -> Option<Uuid> {
        self.connections
            .remove(&connection_id)
            .map(|(_, connection)| connection.session_id)
    }

    /// Distinct online users of a session in first-connected order.
    pub fn online(&self, session_id: Uuid) -> Vec<PresenceMeta> {
        let mut connections: Vec<(u64, PresenceMeta)> = self
            .connections
            .iter()
            .filter(|entry| entry.session_id == session_id)
            .map(|entry| (entry.seq, entry.meta.clone()))
            .collect();
        connections.sort_by_key(|(seq, _)| *seq);

        let mut unique: IndexMap<Uuid, PresenceMeta> = IndexMap::new();
        for (_, meta) in connections {
            unique.entry(meta.user_id).or_insert(meta);
        }
        unique.into_values().collect()
    }

    /// Outbound channels of every socket tracked in a session.
    pub fn senders(&self, session_id: Uuid) -> Vec<mpsc::UnboundedSender<Message>> {
        self.connections
            .iter()
            .filter(|entry| entry.session_id == session_id)
            .map(|entry| entry.tx.clone())
            .collect()
    }
}
