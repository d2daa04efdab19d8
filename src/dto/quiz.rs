use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::QuizEntity,
    dto::{
        format_system_time,
        validation::{validate_not_blank, validate_question},
    },
};

/// Payload creating a quiz whose questions feed multiplayer sessions.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateQuizRequest {
    #[validate(custom(function = "validate_not_blank"), length(max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100), nested)]
    pub questions: Vec<QuestionInput>,
}

/// One multiple-choice question of a quiz.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_question"))]
pub struct QuestionInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    /// Answer options in display order.
    #[validate(length(min = 2, max = 8))]
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Quiz metadata; answers are never exposed here.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub question_count: usize,
    /// Distinct topics across all questions, in first-seen order.
    pub topics: Vec<String>,
    pub created_at: String,
}

impl From<QuizEntity> for QuizSummary {
    fn from(value: QuizEntity) -> Self {
        let topics: IndexSet<&str> = value
            .questions
            .iter()
            .flat_map(|q| q.topics.iter().map(String::as_str))
            .collect();
        let topics = topics.into_iter().map(str::to_owned).collect();
        Self {
            id: value.id,
            title: value.title,
            question_count: value.questions.len(),
            topics,
            created_at: format_system_time(value.created_at),
        }
    }
}
