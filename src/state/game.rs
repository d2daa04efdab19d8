use std::time::SystemTime;

use uuid::Uuid;

use crate::dao::models::{
    ParticipantEntity, ProfileEntity, QuestionEntity, QuizEntity, SessionEntity,
};

pub use crate::dao::models::SessionStatus;

/// Runtime view of a hosted quiz instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// Primary key of the session.
    pub id: Uuid,
    /// User who created the session.
    pub host_id: Uuid,
    /// Code players type to join.
    pub join_code: String,
    /// Lobby/game lifecycle.
    pub status: SessionStatus,
    /// Upper bound on participant rows.
    pub max_participants: u32,
    /// Quiz feeding the questions.
    pub quiz_id: Uuid,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// A joined player with display data resolved from their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameParticipant {
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Cumulative points in this session.
    pub score: u32,
    pub is_ready: bool,
    pub is_host: bool,
    /// Consecutive correct answers.
    pub streak: u32,
    pub joined_at: SystemTime,
}

/// Multiple-choice question as served during a game. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub difficulty: Option<String>,
    pub topics: Vec<String>,
}

impl QuizQuestion {
    /// Whether `option_index` designates the correct option.
    pub fn is_correct(&self, option_index: usize) -> bool {
        self.correct_index == option_index
    }
}

/// Quiz with its ordered question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// Name shown for users that never saved a profile.
pub fn fallback_username(user_id: Uuid) -> String {
    let simple = user_id.simple().to_string();
    format!("player-{}", &simple[..8])
}

impl From<SessionEntity> for GameSession {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            host_id: value.host_id,
            join_code: value.join_code,
            status: value.status,
            max_participants: value.max_participants,
            quiz_id: value.quiz_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<(ParticipantEntity, Option<ProfileEntity>)> for GameParticipant {
    fn from((row, profile): (ParticipantEntity, Option<ProfileEntity>)) -> Self {
        let (username, avatar_url) = match profile {
            Some(profile) => (profile.username, profile.avatar_url),
            None => (fallback_username(row.user_id), None),
        };
        Self {
            user_id: row.user_id,
            username,
            avatar_url,
            score: row.score,
            is_ready: row.is_ready,
            is_host: row.is_host,
            streak: row.streak,
            joined_at: row.joined_at,
        }
    }
}

impl From<QuestionEntity> for QuizQuestion {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
            explanation: value.explanation,
            difficulty: value.difficulty,
            topics: value.topics,
        }
    }
}

impl From<QuizQuestion> for QuestionEntity {
    fn from(value: QuizQuestion) -> Self {
        Self {
            id: value.id,
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
            explanation: value.explanation,
            difficulty: value.difficulty,
            topics: value.topics,
        }
    }
}

impl From<QuizEntity> for Quiz {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            questions: value.questions.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_without_profile_gets_fallback_name() {
        let user_id = Uuid::new_v4();
        let row = ParticipantEntity::new(Uuid::new_v4(), user_id, false);
        let participant = GameParticipant::from((row, None));
        assert!(participant.username.starts_with("player-"));
        assert_eq!(participant.username.len(), "player-".len() + 8);
        assert!(participant.avatar_url.is_none());
    }

    #[test]
    fn participant_uses_profile_display_data() {
        let user_id = Uuid::new_v4();
        let row = ParticipantEntity::new(Uuid::new_v4(), user_id, true);
        let profile = ProfileEntity {
            user_id,
            username: "ada".into(),
            avatar_url: Some("https://cdn.example/ada.png".into()),
            updated_at: SystemTime::now(),
        };
        let participant = GameParticipant::from((row, Some(profile)));
        assert_eq!(participant.username, "ada");
        assert!(participant.is_host);
    }
}
