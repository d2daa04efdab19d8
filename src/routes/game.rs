use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{GameStateView, SubmitAnswerRequest, SubmitAnswerResponse},
    error::{AppError, ErrorBody},
    routes::extract::ActingUser,
    services::game_runner,
    state::SharedState,
};

/// Endpoints of a running game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{id}/game", get(get_game))
        .route("/sessions/{id}/game/answer", post(submit_answer))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/game",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Current game state; includes the caller's answer when identified", body = GameStateView),
        (status = 401, description = "Malformed caller identity", body = ErrorBody),
        (status = 404, description = "No game for this session", body = ErrorBody)
    )
)]
/// Return the phase, countdown, question and leaderboard of a game.
pub async fn get_game(
    State(state): State<SharedState>,
    viewer: Option<ActingUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateView>, AppError> {
    let view = game_runner::game_view(&state, id, viewer.map(|ActingUser(user_id)| user_id)).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/game/answer",
    tag = "game",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded, or ignored when not accepted", body = SubmitAnswerResponse),
        (status = 401, description = "Missing caller identity", body = ErrorBody),
        (status = 404, description = "No game for this session", body = ErrorBody)
    )
)]
/// Select an option for the open question.
pub async fn submit_answer(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let response = game_runner::submit_answer(&state, id, user_id, payload.option_index).await?;
    Ok(Json(response))
}
