use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Study Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::profiles::upsert_profile,
        crate::routes::quizzes::create_quiz,
        crate::routes::quizzes::get_quiz,
        crate::routes::sessions::create_session,
        crate::routes::sessions::join_session,
        crate::routes::sessions::get_lobby,
        crate::routes::sessions::toggle_ready,
        crate::routes::sessions::start_game,
        crate::routes::sessions::leave_session,
        crate::routes::game::get_game,
        crate::routes::game::submit_answer,
        crate::routes::sse::session_stream,
        crate::routes::websocket::presence_handler,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::dto::health::HealthResponse,
            crate::dto::lobby::ProfileInput,
            crate::dto::lobby::ProfileResponse,
            crate::dto::lobby::CreateSessionRequest,
            crate::dto::lobby::JoinSessionRequest,
            crate::dto::lobby::SessionIdResponse,
            crate::dto::lobby::LobbyResponse,
            crate::dto::lobby::StartGameResponse,
            crate::dto::quiz::CreateQuizRequest,
            crate::dto::quiz::QuizSummary,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::SubmitAnswerResponse,
            crate::dto::game::GameStateView,
            crate::dto::sse::Handshake,
            crate::dto::sse::LobbyErrorEvent,
            crate::dto::sse::TickEvent,
            crate::dto::sse::AnswerReceivedEvent,
            crate::dto::sse::GameFinishedEvent,
            crate::dto::sse::PresenceSyncEvent,
            crate::dto::ws::PresenceInboundMessage,
            crate::dto::ws::PresenceOutboundMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "profiles", description = "Player display profiles"),
        (name = "quizzes", description = "Quiz authoring"),
        (name = "sessions", description = "Lobby hosting, joining and readiness"),
        (name = "game", description = "Running game state and answers"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "presence", description = "WebSocket presence channel"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/profiles/me",
            "/quizzes",
            "/quizzes/{id}",
            "/sessions",
            "/sessions/join",
            "/sessions/{id}/lobby",
            "/sessions/{id}/start",
            "/sessions/{id}/game/answer",
            "/sse/sessions/{id}",
            "/ws/sessions/{id}/presence",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
