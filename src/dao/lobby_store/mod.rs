pub mod memory;

use futures::future::BoxFuture;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::dao::models::{
    JoinOutcome, ParticipantEntity, ParticipantUpdate, ProfileEntity, QuizEntity, SessionEntity,
    SessionStatus, StartOutcome,
};
use crate::dao::storage::StorageResult;

pub use self::memory::MemoryStore;

/// Abstraction over the source of truth for profiles, quizzes, sessions and participants.
///
/// Every mutation touching a session publishes a [`ChangeNotification`] that
/// subscribers obtained through [`LobbyStore::subscribe`] receive.
///
/// Operations that depend on the session status (joining, readiness, starting)
/// check it atomically with the participant rows they read or write.
pub trait LobbyStore: Send + Sync {
    /// Create or replace the profile of `profile.user_id`.
    fn upsert_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Profiles of the given users; unknown ids are skipped.
    fn find_profiles(
        &self,
        user_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>>;
    /// Persist a quiz together with its questions.
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a quiz by id.
    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>>;
    /// Insert a session, failing with a conflict when its join code is taken.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a session by id.
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Fetch a session by its exact (uppercase) join code.
    fn find_session_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Overwrite the status unconditionally. Returns `false` when the session does not exist.
    fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Returns `false` when the session does not exist.
    fn update_session_host(
        &self,
        id: Uuid,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Move a waiting session to [`SessionStatus::InProgress`] when `host_id`
    /// hosts it and at least `min_ready` participants joined, all ready.
    ///
    /// Checks and switch happen under one lock, so no join or ready change can
    /// slip in between. The started outcome carries the rows the game runs with.
    fn begin_game(
        &self,
        id: Uuid,
        host_id: Uuid,
        min_ready: usize,
    ) -> BoxFuture<'static, StorageResult<StartOutcome>>;
    /// Add a participant unless the user already joined or `capacity` is reached.
    ///
    /// New rows are only accepted while the session is waiting; a user who
    /// already joined keeps getting [`JoinOutcome::AlreadyJoined`] until the
    /// session completes.
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>>;
    /// Participants of a session ordered by join time.
    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Apply `update` and return the updated row, or `None` when absent.
    ///
    /// [`ParticipantUpdate::ToggleReady`] fails with
    /// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
    /// once the session left the lobby.
    fn update_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        update: ParticipantUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Returns the removed row, if any.
    fn remove_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Open a change feed scoped to one session.
    fn subscribe(&self, session_id: Uuid) -> ChangeFeed;
    /// Cheap liveness check used by the healthcheck.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Table touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTable {
    /// Session rows (status, host).
    Sessions,
    /// Participant rows (joins, readiness, scores, leaves).
    Participants,
}

/// Row-level "something changed" notification; carries no row data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotification {
    /// Table the changed row lives in.
    pub table: ChangeTable,
    /// Session the row belongs to.
    pub session_id: Uuid,
}

/// Item yielded by a [`ChangeFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedItem {
    /// A row belonging to the watched session changed.
    Changed(ChangeNotification),
    /// The subscriber fell behind and dropped notifications; callers should resync.
    Lagged(u64),
}

/// Subscription handle over the store's change channel, filtered to one session.
///
/// Dropping the feed unsubscribes.
pub struct ChangeFeed {
    session_id: Uuid,
    receiver: broadcast::Receiver<ChangeNotification>,
}

impl ChangeFeed {
    /// Wrap a raw broadcast receiver, keeping only notifications for `session_id`.
    pub fn new(session_id: Uuid, receiver: broadcast::Receiver<ChangeNotification>) -> Self {
        Self {
            session_id,
            receiver,
        }
    }

    /// Session this feed is scoped to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Wait for the next relevant item. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<FeedItem> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.session_id == self.session_id => {
                    return Some(FeedItem::Changed(change));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => return Some(FeedItem::Lagged(skipped)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn feed_filters_other_sessions() {
        let (tx, rx) = broadcast::channel(8);
        let watched = Uuid::new_v4();
        let mut feed = ChangeFeed::new(watched, rx);

        tx.send(ChangeNotification {
            table: ChangeTable::Participants,
            session_id: Uuid::new_v4(),
        })
        .unwrap();
        tx.send(ChangeNotification {
            table: ChangeTable::Sessions,
            session_id: watched,
        })
        .unwrap();

        assert_eq!(
            feed.next().await,
            Some(FeedItem::Changed(ChangeNotification {
                table: ChangeTable::Sessions,
                session_id: watched,
            }))
        );
    }

    #[tokio::test]
    async fn feed_reports_lag_and_close() {
        let (tx, rx) = broadcast::channel(1);
        let watched = Uuid::new_v4();
        let mut feed = ChangeFeed::new(watched, rx);

        for _ in 0..3 {
            tx.send(ChangeNotification {
                table: ChangeTable::Participants,
                session_id: watched,
            })
            .unwrap();
        }
        assert!(matches!(feed.next().await, Some(FeedItem::Lagged(_))));

        drop(tx);
        // The last buffered notification is still delivered before close.
        assert!(matches!(feed.next().await, Some(FeedItem::Changed(_))));
        assert_eq!(feed.next().await, None);
    }
}
