use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{game::GameStateView, lobby::ParticipantSummary},
    state::{presence::PresenceMeta, state_machine::GamePhase},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Event carrying a raw text payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    pub session_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once when re-fetching the lobby failed.
pub struct LobbyErrorEvent {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast every second while a phase counts down.
pub struct TickEvent {
    pub phase: GamePhase,
    pub time_remaining: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the game changes phase.
pub struct PhaseChangedEvent(pub GameStateView);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a participant locks in an answer; grading stays private until reveal.
pub struct AnswerReceivedEvent {
    pub user_id: Uuid,
    pub question_index: usize,
    pub answered_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the game reaches its final phase.
pub struct GameFinishedEvent {
    pub session_id: Uuid,
    pub leaderboard: Vec<ParticipantSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Online users of a session after someone connected or left.
pub struct PresenceSyncEvent {
    pub online: Vec<PresenceMeta>,
}
