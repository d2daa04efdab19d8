//! DTO definitions for profiles, session hosting/joining and the lobby view.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::MAX_PARTICIPANTS_LIMIT,
    dto::{
        format_system_time,
        validation::{validate_join_code, validate_not_blank},
    },
    state::{
        game::{GameParticipant, GameSession, SessionStatus},
        lobby::LobbySnapshot,
    },
};

/// Display data the caller wants other players to see.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ProfileInput {
    #[validate(custom(function = "validate_not_blank"), length(max = 40))]
    pub username: String,
    #[serde(default)]
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Stored profile echoed back after an update.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// "Create session" call: host a quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    pub quiz_id: Uuid,
    /// Defaults to the configured cap when omitted.
    #[serde(default)]
    #[validate(range(min = 2, max = MAX_PARTICIPANTS_LIMIT))]
    pub max_participants: Option<u32>,
}

/// "Join session" call: enter a lobby by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinSessionRequest {
    #[validate(custom(function = "validate_join_code"))]
    pub join_code: String,
}

/// Identifier returned by the create/join calls.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionIdResponse {
    pub session_id: Uuid,
    pub join_code: String,
}

/// Session row exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub host_id: Uuid,
    pub join_code: String,
    pub status: SessionStatus,
    pub max_participants: u32,
    pub quiz_id: Uuid,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&GameSession> for SessionSummary {
    fn from(value: &GameSession) -> Self {
        Self {
            id: value.id,
            host_id: value.host_id,
            join_code: value.join_code.clone(),
            status: value.status,
            max_participants: value.max_participants,
            quiz_id: value.quiz_id,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a participant exposed to REST/SSE clients.
pub struct ParticipantSummary {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub score: u32,
    pub is_ready: bool,
    pub is_host: bool,
    pub streak: u32,
}

impl From<&GameParticipant> for ParticipantSummary {
    fn from(value: &GameParticipant) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username.clone(),
            avatar_url: value.avatar_url.clone(),
            score: value.score,
            is_ready: value.is_ready,
            is_host: value.is_host,
            streak: value.streak,
        }
    }
}

/// Whole lobby as pushed on every change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LobbyResponse {
    pub session: SessionSummary,
    pub participants: Vec<ParticipantSummary>,
    pub all_players_ready: bool,
    pub ready_count: usize,
}

impl From<&LobbySnapshot> for LobbyResponse {
    fn from(value: &LobbySnapshot) -> Self {
        Self {
            session: (&value.session).into(),
            participants: value.participants.iter().map(Into::into).collect(),
            all_players_ready: value.all_players_ready(),
            ready_count: value.ready_count(),
        }
    }
}

/// Why a start request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StartRefusal {
    /// Only the host may start.
    NotHost,
    /// Fewer than two participants, or someone is not ready.
    NotAllReady,
    /// The session already left the waiting state.
    NotWaiting,
}

/// Response of the start call; refusals are not errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StartRefusal>,
}

impl StartGameResponse {
    pub fn started() -> Self {
        Self {
            started: true,
            reason: None,
        }
    }

    pub fn refused(reason: StartRefusal) -> Self {
        Self {
            started: false,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_participants_must_allow_a_game() {
        let quiz_id = Uuid::new_v4();
        let too_small = CreateSessionRequest {
            quiz_id,
            max_participants: Some(1),
        };
        let defaulted = CreateSessionRequest {
            quiz_id,
            max_participants: None,
        };
        assert!(too_small.validate().is_err());
        assert!(defaulted.validate().is_ok());
    }

    #[test]
    fn refusal_serializes_reason() {
        let json = serde_json::to_value(StartGameResponse::refused(StartRefusal::NotAllReady))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "started": false, "reason": "not_all_ready" })
        );
        let json = serde_json::to_value(StartGameResponse::started()).unwrap();
        assert_eq!(json, serde_json::json!({ "started": true }));
    }

    #[test]
    fn avatar_must_be_a_url() {
        let profile = ProfileInput {
            username: "ada".into(),
            avatar_url: Some("not a url".into()),
        };
        assert!(profile.validate().is_err());
    }
}
