use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::lobby::{
        CreateSessionRequest, JoinSessionRequest, LobbyResponse, SessionIdResponse,
        StartGameResponse,
    },
    error::{AppError, ErrorBody},
    routes::extract::ActingUser,
    services::lobby_service,
    state::SharedState,
};

/// Lobby endpoints: hosting, joining, readiness, start and leave.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/join", post(join_session))
        .route("/sessions/{id}/lobby", get(get_lobby))
        .route("/sessions/{id}/ready", post(toggle_ready))
        .route("/sessions/{id}/start", post(start_game))
        .route("/sessions/{id}/leave", post(leave_session))
}

#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created; the caller hosts it", body = SessionIdResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Missing caller identity", body = ErrorBody),
        (status = 404, description = "Quiz not found", body = ErrorBody)
    )
)]
/// Host a new session of an existing quiz.
pub async fn create_session(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionIdResponse>), AppError> {
    let created = lobby_service::create_session(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/sessions/join",
    tag = "sessions",
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Joined (or already in) the session", body = SessionIdResponse),
        (status = 400, description = "Malformed join code"),
        (status = 401, description = "Missing caller identity", body = ErrorBody),
        (status = 404, description = "No session with this code", body = ErrorBody),
        (status = 409, description = "Session full or already started", body = ErrorBody)
    )
)]
/// Join a waiting session by its code.
pub async fn join_session(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<Json<SessionIdResponse>, AppError> {
    let joined = lobby_service::join_session(&state, user_id, payload).await?;
    Ok(Json(joined))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/lobby",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session and participants", body = LobbyResponse),
        (status = 404, description = "Session not found", body = ErrorBody)
    )
)]
/// Return the lobby: session row plus participants in join order.
pub async fn get_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyResponse>, AppError> {
    let snapshot = lobby_service::lobby_snapshot(&state, id).await?;
    Ok(Json(LobbyResponse::from(&snapshot)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/ready",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Refreshed lobby after the toggle", body = LobbyResponse),
        (status = 401, description = "Missing caller identity", body = ErrorBody),
        (status = 403, description = "Caller is not a participant", body = ErrorBody),
        (status = 409, description = "Session is not waiting", body = ErrorBody)
    )
)]
/// Flip the caller's ready flag.
pub async fn toggle_ready(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyResponse>, AppError> {
    let snapshot = lobby_service::toggle_ready(&state, id, user_id).await?;
    Ok(Json(LobbyResponse::from(&snapshot)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/start",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Whether the game started, with the refusal reason otherwise", body = StartGameResponse),
        (status = 401, description = "Missing caller identity", body = ErrorBody),
        (status = 404, description = "Session not found", body = ErrorBody)
    )
)]
/// Start the game; only the host can, once everyone is ready.
pub async fn start_game(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StartGameResponse>, AppError> {
    let response = lobby_service::start_game(&state, id, user_id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/leave",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Left the session"),
        (status = 401, description = "Missing caller identity", body = ErrorBody),
        (status = 403, description = "Caller is not a participant", body = ErrorBody),
        (status = 404, description = "Session not found", body = ErrorBody)
    )
)]
/// Leave the session, handing the host role over when needed.
pub async fn leave_session(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    lobby_service::leave_session(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
