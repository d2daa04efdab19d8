use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    dao::models::SessionStatus,
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    services::{lobby_service, sse_events},
    state::{SharedState, SseHub},
};

/// A live subscription plus the events only this subscriber should see first.
pub struct SessionSubscription {
    pub receiver: broadcast::Receiver<ServerEvent>,
    pub initial: Vec<ServerEvent>,
}

/// Subscribe to a session's event stream after checking the session exists.
///
/// The first events are a handshake and the current lobby so late
/// subscribers start from a full snapshot.
pub async fn subscribe_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSubscription, ServiceError> {
    // subscribe before reading so no change slips between the read and the stream
    let mut receiver = state.session_hub(session_id).subscribe();
    let snapshot = match lobby_service::lobby_snapshot(state, session_id).await {
        Ok(snapshot) => snapshot,
        Err(err @ ServiceError::NotFound(_)) => {
            state.drop_session_hub(session_id);
            return Err(err);
        }
        Err(err) => return Err(err),
    };
    if snapshot.session.status == SessionStatus::Completed {
        // nothing will be published again; end the stream after the initial events
        state.drop_session_hub(session_id);
        receiver = SseHub::new(1).subscribe();
    }

    let mut initial = Vec::with_capacity(2);
    let handshake = Handshake {
        session_id,
        message: format!("Connected to session {}", snapshot.session.join_code),
    };
    if let Ok(event) = ServerEvent::json(Some("handshake".to_string()), &handshake) {
        initial.push(event);
    }
    if let Ok(event) = sse_events::lobby_snapshot_event(&snapshot) {
        initial.push(event);
    }

    Ok(SessionSubscription { receiver, initial })
}

/// Convert a subscription into an SSE response, forwarding events until the
/// client disconnects or the session hub goes away.
pub fn to_sse_stream(
    subscription: SessionSubscription,
    session_id: Uuid,
    keep_alive: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let SessionSubscription {
        mut receiver,
        initial,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: replays the initial events, then reads from broadcast
    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            tracing::debug!(%session_id, skipped, "session SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(%session_id, "Session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive).text("keep-alive"))
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            lobby_store::MemoryStore,
            models::{ParticipantEntity, SessionEntity},
        },
        state::AppState,
    };

    async fn seeded(status: SessionStatus) -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default(), Arc::new(MemoryStore::default()));
        let now = SystemTime::now();
        let host = Uuid::new_v4();
        let session = SessionEntity {
            id: Uuid::new_v4(),
            host_id: host,
            join_code: "STREAM".into(),
            status: SessionStatus::Waiting,
            max_participants: 4,
            quiz_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let session_id = session.id;
        state.store().insert_session(session).await.unwrap();
        state
            .store()
            .insert_participant(ParticipantEntity::new(session_id, host, true), 4)
            .await
            .unwrap();
        state
            .store()
            .update_session_status(session_id, status)
            .await
            .unwrap();
        (state, session_id)
    }

    #[tokio::test]
    async fn subscriber_starts_with_handshake_and_lobby() {
        let (state, session_id) = seeded(SessionStatus::Waiting).await;
        let mut subscription = subscribe_session(&state, session_id).await.unwrap();

        let names: Vec<_> = subscription
            .initial
            .iter()
            .map(|event| event.event.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["handshake", "lobby.snapshot"]);

        sse_events::broadcast_lobby_error(&state, session_id, "boom".into());
        let live = subscription.receiver.recv().await.unwrap();
        assert_eq!(live.event.as_deref(), Some("lobby.error"));
    }

    #[tokio::test]
    async fn completed_session_stream_closes_after_initial_events() {
        let (state, session_id) = seeded(SessionStatus::Completed).await;
        let mut subscription = subscribe_session(&state, session_id).await.unwrap();

        assert_eq!(subscription.initial.len(), 2);
        assert!(matches!(
            subscription.receiver.recv().await,
            Err(RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = AppState::new(AppConfig::default(), Arc::new(MemoryStore::default()));
        let result = subscribe_session(&state, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
