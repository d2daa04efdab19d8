use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::quiz::{CreateQuizRequest, QuizSummary},
    error::AppError,
    routes::extract::ActingUser,
    services::quiz_service,
    state::SharedState,
};

/// Quiz authoring endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/{id}", get(get_quiz))
}

#[utoipa::path(
    post,
    path = "/quizzes",
    tag = "quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created", body = QuizSummary),
        (status = 400, description = "Invalid quiz"),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody)
    )
)]
/// Create a quiz whose questions can then be played in sessions.
pub async fn create_quiz(
    State(state): State<SharedState>,
    ActingUser(_author): ActingUser,
    Valid(Json(payload)): Valid<Json<CreateQuizRequest>>,
) -> Result<(StatusCode, Json<QuizSummary>), AppError> {
    let summary = quiz_service::create_quiz(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    tag = "quizzes",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Quiz metadata", body = QuizSummary),
        (status = 404, description = "Quiz not found", body = crate::error::ErrorBody)
    )
)]
/// Return quiz metadata without the answers.
pub async fn get_quiz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizSummary>, AppError> {
    let summary = quiz_service::quiz_summary(&state, id).await?;
    Ok(Json(summary))
}
