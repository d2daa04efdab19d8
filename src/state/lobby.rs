use uuid::Uuid;

use crate::state::game::{GameParticipant, GameSession};

/// Fewest participants a game can start with.
pub const MIN_READY_PLAYERS: usize = 2;

/// True when at least [`MIN_READY_PLAYERS`] joined and every one of them is ready.
pub fn all_players_ready(participants: &[GameParticipant]) -> bool {
    participants.len() >= MIN_READY_PLAYERS && participants.iter().all(|p| p.is_ready)
}

/// Full lobby state as read from the store: session row plus joined participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySnapshot {
    pub session: GameSession,
    /// Participants in join order.
    pub participants: Vec<GameParticipant>,
}

impl LobbySnapshot {
    /// See [`all_players_ready`].
    pub fn all_players_ready(&self) -> bool {
        all_players_ready(&self.participants)
    }

    /// Participant row flagged as host.
    pub fn host(&self) -> Option<&GameParticipant> {
        self.participants.iter().find(|p| p.is_host)
    }

    pub fn participant(&self, user_id: Uuid) -> Option<&GameParticipant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Whether `user_id` hosts this session.
    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.session.host_id == user_id
            && self.participant(user_id).is_some_and(|p| p.is_host)
    }

    pub fn ready_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_ready).count()
    }
}
