use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the store and report how many games are registered.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let live_games = state.games().len();
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(live_games),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(live_games)
        }
    }
}
