use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{QuestionEntity, QuizEntity},
    dto::quiz::{CreateQuizRequest, QuestionInput, QuizSummary},
    error::ServiceError,
    state::SharedState,
};

/// Persist a new quiz; every question gets its own identifier.
pub async fn create_quiz(
    state: &SharedState,
    request: CreateQuizRequest,
) -> Result<QuizSummary, ServiceError> {
    let CreateQuizRequest { title, questions } = request;

    let quiz = QuizEntity {
        id: Uuid::new_v4(),
        title: title.trim().to_string(),
        questions: questions.into_iter().map(build_question).collect(),
        created_at: SystemTime::now(),
    };

    state.store().save_quiz(quiz.clone()).await?;
    info!(quiz_id = %quiz.id, questions = quiz.questions.len(), "quiz created");

    Ok(quiz.into())
}

/// Quiz metadata without answers.
pub async fn quiz_summary(state: &SharedState, id: Uuid) -> Result<QuizSummary, ServiceError> {
    state
        .store()
        .find_quiz(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{id}` not found")))
}

fn build_question(input: QuestionInput) -> QuestionEntity {
    QuestionEntity {
        id: Uuid::new_v4(),
        text: input.text.trim().to_string(),
        options: input
            .options
            .into_iter()
            .map(|option| option.trim().to_string())
            .collect(),
        correct_index: input.correct_index,
        explanation: input.explanation.filter(|text| !text.trim().is_empty()),
        difficulty: input.difficulty,
        topics: input.topics,
    }
}
