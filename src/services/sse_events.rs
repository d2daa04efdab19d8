use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        game::GameStateView,
        lobby::LobbyResponse,
        sse::{
            AnswerReceivedEvent, GameFinishedEvent, LobbyErrorEvent, PhaseChangedEvent,
            PresenceSyncEvent, ServerEvent, TickEvent,
        },
    },
    state::{
        SharedState,
        lobby::LobbySnapshot,
        presence::PresenceMeta,
        state_machine::{AnswerOutcome, GameState},
    },
};

const EVENT_LOBBY_SNAPSHOT: &str = "lobby.snapshot";
const EVENT_LOBBY_ERROR: &str = "lobby.error";
const EVENT_GAME_PHASE: &str = "game.phase";
const EVENT_GAME_TICK: &str = "game.tick";
const EVENT_GAME_ANSWER: &str = "game.answer";
const EVENT_GAME_FINISHED: &str = "game.finished";
const EVENT_PRESENCE_SYNC: &str = "presence.sync";

/// Lobby snapshot event addressed to a single new subscriber.
pub fn lobby_snapshot_event(snapshot: &LobbySnapshot) -> serde_json::Result<ServerEvent> {
    ServerEvent::json(
        Some(EVENT_LOBBY_SNAPSHOT.to_string()),
        &LobbyResponse::from(snapshot),
    )
}

/// Broadcast the full lobby after a refresh.
pub fn broadcast_lobby_snapshot(state: &SharedState, snapshot: &LobbySnapshot) {
    let payload = LobbyResponse::from(snapshot);
    send_session_event(state, snapshot.session.id, EVENT_LOBBY_SNAPSHOT, &payload);
}

/// Broadcast a lobby refresh failure. Sent once per failure; nothing retries it.
pub fn broadcast_lobby_error(state: &SharedState, session_id: Uuid, message: String) {
    let payload = LobbyErrorEvent {
        session_id,
        message,
    };
    send_session_event(state, session_id, EVENT_LOBBY_ERROR, &payload);
}

/// Broadcast the public game view after a phase change.
pub fn broadcast_phase_changed(state: &SharedState, game: &GameState) {
    let payload = PhaseChangedEvent(GameStateView::build(game, None));
    send_session_event(state, game.session().id, EVENT_GAME_PHASE, &payload);
}

/// Broadcast a countdown tick.
pub fn broadcast_tick(state: &SharedState, game: &GameState) {
    let payload = TickEvent {
        phase: game.phase(),
        time_remaining: game.time_remaining(),
    };
    send_session_event(state, game.session().id, EVENT_GAME_TICK, &payload);
}

/// Broadcast that a participant answered, without revealing correctness.
pub fn broadcast_answer_received(state: &SharedState, game: &GameState, outcome: &AnswerOutcome) {
    let payload = AnswerReceivedEvent {
        user_id: outcome.user_id,
        question_index: outcome.question_index,
        answered_count: game.answered_count(),
    };
    send_session_event(state, game.session().id, EVENT_GAME_ANSWER, &payload);
}

/// Broadcast the final standings.
pub fn broadcast_game_finished(state: &SharedState, game: &GameState) {
    let payload = GameFinishedEvent {
        session_id: game.session().id,
        leaderboard: game.leaderboard().into_iter().map(Into::into).collect(),
    };
    send_session_event(state, game.session().id, EVENT_GAME_FINISHED, &payload);
}

/// Mirror the presence list onto the session's SSE stream.
pub fn broadcast_presence_sync(state: &SharedState, session_id: Uuid, online: Vec<PresenceMeta>) {
    let payload = PresenceSyncEvent { online };
    send_session_event(state, session_id, EVENT_PRESENCE_SYNC, &payload);
}

/// Publish to the session's stream; sessions nobody subscribed to (or whose
/// hub was already released) are skipped so no hub is created here.
fn send_session_event(state: &SharedState, session_id: Uuid, event: &str, payload: &impl Serialize) {
    let Some(hub) = state.existing_session_hub(session_id) else {
        return;
    };
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, %session_id, error = %err, "failed to serialize session SSE payload"),
    }
}
