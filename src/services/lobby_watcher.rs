//! Keeps every SSE subscriber of a session in sync with the store.
//!
//! Each session gets one watcher task. It listens to the store's change feed
//! for that session and re-broadcasts the full lobby on every notification.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        lobby_store::{ChangeFeed, FeedItem},
        models::SessionStatus,
    },
    services::{lobby_service, sse_events},
    state::SharedState,
};

/// Start watching `session_id`, replacing any watcher already running for it.
pub fn spawn(state: &SharedState, session_id: Uuid) {
    // subscribe before spawning so changes made right after creation are seen
    let feed = state.store().subscribe(session_id);
    let cancel = state.child_token();

    if let Some(previous) = state.watchers().insert(session_id, cancel.clone()) {
        previous.cancel();
    }

    let state = state.clone();
    tokio::spawn(async move {
        run(state, feed, cancel).await;
    });
}

async fn run(state: SharedState, mut feed: ChangeFeed, cancel: CancellationToken) {
    let session_id = feed.session_id();
    info!(%session_id, "lobby watcher started");

    let finished = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%session_id, "lobby watcher cancelled");
                break false;
            }
            item = feed.next() => {
                match item {
                    Some(FeedItem::Changed(change)) => {
                        debug!(%session_id, table = ?change.table, "lobby change received");
                    }
                    Some(FeedItem::Lagged(skipped)) => {
                        warn!(%session_id, skipped, "lobby watcher lagged, resyncing");
                    }
                    None => {
                        info!(%session_id, "change feed closed");
                        break true;
                    }
                }

                if refresh(&state, session_id).await == Some(SessionStatus::Completed) {
                    break true;
                }
            }
        }
    };

    // dropping the feed releases the store subscription
    drop(feed);

    if finished {
        state.watchers().remove(&session_id);
        state.drop_session_hub(session_id);
    }
    info!(%session_id, "lobby watcher stopped");
}

/// Re-read the whole lobby and broadcast it; failures are reported once.
async fn refresh(state: &SharedState, session_id: Uuid) -> Option<SessionStatus> {
    match lobby_service::lobby_snapshot(state, session_id).await {
        Ok(snapshot) => {
            sse_events::broadcast_lobby_snapshot(state, &snapshot);
            Some(snapshot.session.status)
        }
        Err(err) => {
            warn!(%session_id, error = %err, "lobby refresh failed");
            sse_events::broadcast_lobby_error(state, session_id, err.to_string());
            None
        }
    }
}
