use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod extract;
pub mod game;
pub mod health;
pub mod profiles;
pub mod quizzes;
pub mod sessions;
pub mod sse;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(profiles::router())
        .merge(quizzes::router())
        .merge(sessions::router())
        .merge(game::router())
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
