use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a hosted session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Lobby is open and players can join.
    Waiting,
    /// The host started the game.
    InProgress,
    /// The game ended or the lobby was abandoned.
    Completed,
}

/// Public profile of a user, joined into participant rows on fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntity {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub updated_at: SystemTime,
}

/// Quiz definition owning its ordered questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    pub id: Uuid,
    pub title: String,
    pub questions: Vec<QuestionEntity>,
    pub created_at: SystemTime,
}

/// A single multiple-choice question stored inside a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    pub id: Uuid,
    pub text: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub difficulty: Option<String>,
    pub topics: Vec<String>,
}

/// Row describing a hosted quiz instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    pub id: Uuid,
    pub host_id: Uuid,
    /// Uppercase alphanumeric code players type to join.
    pub join_code: String,
    pub status: SessionStatus,
    pub max_participants: u32,
    pub quiz_id: Uuid,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Row describing one joined player. Display data lives in [`ProfileEntity`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub score: u32,
    pub is_ready: bool,
    pub is_host: bool,
    /// Consecutive correct answers.
    pub streak: u32,
    pub joined_at: SystemTime,
}

impl ParticipantEntity {
    /// Fresh participant row with zeroed score and streak.
    pub fn new(session_id: Uuid, user_id: Uuid, is_host: bool) -> Self {
        Self {
            session_id,
            user_id,
            score: 0,
            is_ready: false,
            is_host,
            streak: 0,
            joined_at: SystemTime::now(),
        }
    }
}

/// Mutation applied to a single participant row at the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantUpdate {
    /// Flip the ready flag in place.
    ToggleReady,
    /// Grant or revoke the host flag.
    SetHost(bool),
    /// Overwrite score and streak after a scored answer.
    Score { score: u32, streak: u32 },
}

impl ParticipantUpdate {
    /// Apply the mutation to `row`.
    pub fn apply(self, row: &mut ParticipantEntity) {
        match self {
            ParticipantUpdate::ToggleReady => row.is_ready = !row.is_ready,
            ParticipantUpdate::SetHost(is_host) => row.is_host = is_host,
            ParticipantUpdate::Score { score, streak } => {
                row.score = score;
                row.streak = streak;
            }
        }
    }
}

/// Result of trying to add a participant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new row was created.
    Inserted,
    /// The user already had a row for this session.
    AlreadyJoined,
    /// The session reached its participant limit.
    Full,
    /// The session no longer accepts players.
    Closed,
}

/// Result of moving a lobby into its game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The session is now in progress; rows as they were at the switch.
    Started(Vec<ParticipantEntity>),
    /// No session with that id.
    Missing,
    /// The session already left the lobby.
    NotWaiting,
    /// The caller does not host the session.
    NotHost,
    /// Too few participants, or someone is not ready.
    NotAllReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_ready_twice_restores_flag() {
        let mut row = ParticipantEntity::new(Uuid::new_v4(), Uuid::new_v4(), false);
        ParticipantUpdate::ToggleReady.apply(&mut row);
        assert!(row.is_ready);
        ParticipantUpdate::ToggleReady.apply(&mut row);
        assert!(!row.is_ready);
    }

    #[test]
    fn score_update_overwrites_both_counters() {
        let mut row = ParticipantEntity::new(Uuid::new_v4(), Uuid::new_v4(), false);
        ParticipantUpdate::Score {
            score: 370,
            streak: 2,
        }
        .apply(&mut row);
        assert_eq!((row.score, row.streak), (370, 2));
    }
}
