use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when the store answers, "degraded" otherwise.
    pub status: String,
    /// Games whose timer task is still registered.
    pub live_games: usize,
}

impl HealthResponse {
    pub fn ok(live_games: usize) -> Self {
        Self {
            status: "ok".to_string(),
            live_games,
        }
    }

    pub fn degraded(live_games: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            live_games,
        }
    }
}
