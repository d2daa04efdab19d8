use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{PresenceInboundMessage, PresenceOutboundMessage},
    services::sse_events,
    state::SharedState,
};

/// Handle the full lifecycle of one presence WebSocket in `session_id`.
///
/// The first frame must be a `track` message; anything else closes the socket.
pub async fn handle_socket(state: SharedState, session_id: Uuid, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let timeout = state.config().presence_timeout;
    let initial_message = match tokio::time::timeout(timeout, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(%session_id, error = %err, "presence socket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!(%session_id, "presence track timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let Ok(PresenceInboundMessage::Track(payload)) =
        PresenceInboundMessage::from_json_str(&initial_message)
    else {
        warn!(%session_id, "first presence message was not a valid track");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let connection_id = Uuid::new_v4();
    let user_id = payload.user_id;
    state
        .presence()
        .track(connection_id, session_id, payload.into(), outbound_tx.clone());
    info!(%session_id, %user_id, "presence tracked");
    sync_session(&state, session_id);

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match PresenceInboundMessage::from_json_str(&text) {
                Ok(PresenceInboundMessage::Track(payload)) => {
                    state.presence().track(
                        connection_id,
                        session_id,
                        payload.into(),
                        outbound_tx.clone(),
                    );
                    sync_session(&state, session_id);
                }
                Ok(PresenceInboundMessage::Untrack) => {
                    if state.presence().untrack(connection_id).is_some() {
                        sync_session(&state, session_id);
                    }
                }
                Ok(PresenceInboundMessage::Unknown) => {
                    warn!(%session_id, %user_id, "ignoring unknown presence message");
                }
                Err(err) => {
                    warn!(%session_id, %user_id, error = %err, "failed to parse or validate presence message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%session_id, %user_id, error = %err, "presence socket error");
                break;
            }
        }
    }

    if state.presence().untrack(connection_id).is_some() {
        sync_session(&state, session_id);
    }
    info!(%session_id, %user_id, "presence socket closed");

    finalize(writer_task, outbound_tx).await;
}

/// Push the session's online list to its sockets and its SSE stream.
fn sync_session(state: &SharedState, session_id: Uuid) {
    let online = state.presence().online(session_id);
    let message = PresenceOutboundMessage::Sync {
        online: online.clone(),
    };
    match serde_json::to_string(&message) {
        Ok(payload) => {
            for tx in state.presence().senders(session_id) {
                // closed writers are untracked by their own handler
                let _ = tx.send(Message::Text(payload.clone().into()));
            }
        }
        Err(err) => warn!(%session_id, error = %err, "failed to serialize presence sync"),
    }
    sse_events::broadcast_presence_sync(state, session_id, online);
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
