use axum::{Json, Router, extract::State, routing::put};
use axum_valid::Valid;

use crate::{
    dto::lobby::{ProfileInput, ProfileResponse},
    error::AppError,
    routes::extract::ActingUser,
    services::profile_service,
    state::SharedState,
};

/// Profile endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/profiles/me", put(upsert_profile))
}

#[utoipa::path(
    put,
    path = "/profiles/me",
    tag = "profiles",
    request_body = ProfileInput,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Invalid profile"),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody)
    )
)]
/// Create or replace the caller's display name and avatar.
pub async fn upsert_profile(
    State(state): State<SharedState>,
    ActingUser(user_id): ActingUser,
    Valid(Json(payload)): Valid<Json<ProfileInput>>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = profile_service::upsert_profile(&state, user_id, payload).await?;
    Ok(Json(profile))
}
