use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::lobby::ParticipantSummary,
    state::{
        game::{GameParticipant, QuizQuestion},
        state_machine::{AnswerOutcome, AnswerRecord, GamePhase, GameState, rank_by_score},
    },
};

/// Selected option for the open question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(range(max = 7))]
    pub option_index: usize,
}

/// Outcome of an answer submission. Ignored submissions are not errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
}

impl SubmitAnswerResponse {
    pub fn ignored() -> Self {
        Self {
            accepted: false,
            answer: None,
            score: None,
            streak: None,
        }
    }
}

impl From<&AnswerOutcome> for SubmitAnswerResponse {
    fn from(value: &AnswerOutcome) -> Self {
        Self {
            accepted: true,
            answer: Some((&value.record).into()),
            score: Some(value.score),
            streak: Some(value.streak),
        }
    }
}

/// A recorded selection with its grading.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerView {
    pub option_index: usize,
    pub correct: bool,
    pub points: u32,
}

impl From<&AnswerRecord> for AnswerView {
    fn from(value: &AnswerRecord) -> Self {
        Self {
            option_index: value.option_index,
            correct: value.correct,
            points: value.points,
        }
    }
}

/// Question as shown to players; the answer stays hidden until the reveal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionView {
    fn build(question: &QuizQuestion, revealed: bool) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            options: question.options.clone(),
            difficulty: question.difficulty.clone(),
            correct_index: revealed.then_some(question.correct_index),
            explanation: if revealed {
                question.explanation.clone()
            } else {
                None
            },
        }
    }
}

/// Snapshot of a running game, optionally personalised for the caller.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateView {
    pub session_id: Uuid,
    pub phase: GamePhase,
    pub time_remaining: u32,
    /// Zero-based index of the question on screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
    pub question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub answered_count: usize,
    /// Participants ranked by score.
    pub leaderboard: Vec<ParticipantSummary>,
    /// Caller's own answer to the question on screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_answer: Option<AnswerView>,
}

impl GameStateView {
    /// Build a view of `game`, including `viewer`'s answer when given.
    pub fn build(game: &GameState, viewer: Option<Uuid>) -> Self {
        let phase = game.phase();
        let question = game.current_question();
        Self {
            session_id: game.session().id,
            phase,
            time_remaining: game.time_remaining(),
            question_index: question.map(|_| game.question_index()),
            question_count: game.question_count(),
            question: question
                .map(|question| QuestionView::build(question, phase == GamePhase::AnswerReveal)),
            answered_count: game.answered_count(),
            leaderboard: game.leaderboard().into_iter().map(Into::into).collect(),
            my_answer: viewer
                .and_then(|user_id| game.answer_for(user_id))
                .map(Into::into),
        }
    }

    /// Final standings of a game whose engine state was released, from stored rows.
    pub fn finished(
        session_id: Uuid,
        question_count: usize,
        participants: &[GameParticipant],
    ) -> Self {
        Self {
            session_id,
            phase: GamePhase::Finished,
            time_remaining: 0,
            question_index: None,
            question_count,
            question: None,
            answered_count: 0,
            leaderboard: rank_by_score(participants)
                .into_iter()
                .map(Into::into)
                .collect(),
            my_answer: None,
        }
    }
}
