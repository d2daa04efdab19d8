use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::ProfileEntity,
    dto::lobby::{ProfileInput, ProfileResponse},
    error::ServiceError,
    state::SharedState,
};

/// Create or replace the caller's display profile.
pub async fn upsert_profile(
    state: &SharedState,
    user_id: Uuid,
    input: ProfileInput,
) -> Result<ProfileResponse, ServiceError> {
    let profile = ProfileEntity {
        user_id,
        username: input.username.trim().to_string(),
        avatar_url: input.avatar_url,
        updated_at: SystemTime::now(),
    };

    state.store().upsert_profile(profile.clone()).await?;
    info!(%user_id, username = %profile.username, "profile saved");

    Ok(ProfileResponse {
        user_id,
        username: profile.username,
        avatar_url: profile.avatar_url,
    })
}
