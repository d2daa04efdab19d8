//! In-process [`LobbyStore`] backed by `DashMap` tables and a broadcast change channel.

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    lobby_store::{ChangeFeed, ChangeNotification, ChangeTable, LobbyStore},
    models::{
        JoinOutcome, ParticipantEntity, ParticipantUpdate, ProfileEntity, QuizEntity,
        SessionEntity, SessionStatus, StartOutcome,
    },
    storage::{StorageError, StorageResult},
};

const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// Cheaply clonable in-memory store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    profiles: DashMap<Uuid, ProfileEntity>,
    quizzes: DashMap<Uuid, QuizEntity>,
    sessions: DashMap<Uuid, SessionEntity>,
    join_codes: DashMap<String, Uuid>,
    /// Participant rows grouped per session so uniqueness and capacity are checked under one lock.
    ///
    /// Status-dependent operations hold this entry while reading or writing
    /// the session row; the lock order is always participants, then sessions.
    participants: DashMap<Uuid, Vec<ParticipantEntity>>,
    changes: broadcast::Sender<ChangeNotification>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_CAPACITY)
    }
}

impl MemoryStore {
    /// Build an empty store whose change channel buffers `change_capacity` notifications.
    pub fn new(change_capacity: usize) -> Self {
        let (changes, _rx) = broadcast::channel(change_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                profiles: DashMap::new(),
                quizzes: DashMap::new(),
                sessions: DashMap::new(),
                join_codes: DashMap::new(),
                participants: DashMap::new(),
                changes,
            }),
        }
    }
}

impl Inner {
    fn notify(&self, table: ChangeTable, session_id: Uuid) {
        // No subscribers is fine.
        let _ = self.changes.send(ChangeNotification { table, session_id });
    }

    fn session_status(&self, id: Uuid) -> Option<SessionStatus> {
        self.sessions.get(&id).map(|session| session.status)
    }

    fn touch_session(&self, id: Uuid, mutate: impl FnOnce(&mut SessionEntity)) -> bool {
        let updated = match self.sessions.get_mut(&id) {
            Some(mut session) => {
                mutate(&mut session);
                session.updated_at = SystemTime::now();
                true
            }
            None => false,
        };
        if updated {
            self.notify(ChangeTable::Sessions, id);
        }
        updated
    }
}

impl LobbyStore for MemoryStore {
    fn upsert_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        async move {
            inner.profiles.insert(profile.user_id, profile);
            Ok(())
        }
        .boxed()
    }

    fn find_profiles(
        &self,
        user_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>> {
        let inner = self.inner.clone();
        async move {
            Ok(user_ids
                .iter()
                .filter_map(|id| inner.profiles.get(id).map(|entry| entry.value().clone()))
                .collect())
        }
        .boxed()
    }

    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        async move {
            inner.quizzes.insert(quiz.id, quiz);
            Ok(())
        }
        .boxed()
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let inner = self.inner.clone();
        async move { Ok(inner.quizzes.get(&id).map(|entry| entry.value().clone())) }.boxed()
    }

    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        async move {
            match inner.join_codes.entry(session.join_code.clone()) {
                Entry::Occupied(_) => {
                    return Err(StorageError::Conflict(format!(
                        "join code `{}` already in use",
                        session.join_code
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(session.id);
                }
            }
            let id = session.id;
            inner.sessions.insert(id, session);
            inner.participants.entry(id).or_default();
            inner.notify(ChangeTable::Sessions, id);
            Ok(())
        }
        .boxed()
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        async move { Ok(inner.sessions.get(&id).map(|entry| entry.value().clone())) }.boxed()
    }

    fn find_session_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        async move {
            let Some(id) = inner.join_codes.get(&join_code).map(|entry| *entry.value()) else {
                return Ok(None);
            };
            Ok(inner.sessions.get(&id).map(|entry| entry.value().clone()))
        }
        .boxed()
    }

    fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        async move { Ok(inner.touch_session(id, |session| session.status = status)) }.boxed()
    }

    fn update_session_host(
        &self,
        id: Uuid,
        host_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        async move { Ok(inner.touch_session(id, |session| session.host_id = host_id)) }.boxed()
    }

    fn begin_game(
        &self,
        id: Uuid,
        host_id: Uuid,
        min_ready: usize,
    ) -> BoxFuture<'static, StorageResult<StartOutcome>> {
        let inner = self.inner.clone();
        async move {
            let outcome = {
                let Some(rows) = inner.participants.get_mut(&id) else {
                    return Ok(StartOutcome::Missing);
                };
                let Some(mut session) = inner.sessions.get_mut(&id) else {
                    return Ok(StartOutcome::Missing);
                };
                let host_row = rows
                    .iter()
                    .any(|row| row.user_id == host_id && row.is_host);

                if session.status != SessionStatus::Waiting {
                    StartOutcome::NotWaiting
                } else if session.host_id != host_id || !host_row {
                    StartOutcome::NotHost
                } else if rows.len() < min_ready || !rows.iter().all(|row| row.is_ready) {
                    StartOutcome::NotAllReady
                } else {
                    session.status = SessionStatus::InProgress;
                    session.updated_at = SystemTime::now();
                    let mut started = rows.to_vec();
                    started.sort_by_key(|row| row.joined_at);
                    StartOutcome::Started(started)
                }
            };
            if matches!(outcome, StartOutcome::Started(_)) {
                inner.notify(ChangeTable::Sessions, id);
            }
            debug!(session_id = %id, started = matches!(outcome, StartOutcome::Started(_)), "begin game");
            Ok(outcome)
        }
        .boxed()
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
        capacity: u32,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let inner = self.inner.clone();
        async move {
            let session_id = participant.session_id;
            let outcome = match inner.participants.get_mut(&session_id) {
                None => JoinOutcome::Closed,
                Some(mut rows) => {
                    let joined = rows.iter().any(|row| row.user_id == participant.user_id);
                    match inner.session_status(session_id) {
                        None | Some(SessionStatus::Completed) => JoinOutcome::Closed,
                        Some(_) if joined => JoinOutcome::AlreadyJoined,
                        Some(SessionStatus::InProgress) => JoinOutcome::Closed,
                        Some(SessionStatus::Waiting) if rows.len() >= capacity as usize => {
                            JoinOutcome::Full
                        }
                        Some(SessionStatus::Waiting) => {
                            rows.push(participant);
                            JoinOutcome::Inserted
                        }
                    }
                }
            };
            if outcome == JoinOutcome::Inserted {
                inner.notify(ChangeTable::Participants, session_id);
            }
            debug!(%session_id, ?outcome, "participant insert");
            Ok(outcome)
        }
        .boxed()
    }

    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let inner = self.inner.clone();
        async move {
            let mut rows = inner
                .participants
                .get(&session_id)
                .map(|entry| entry.value().clone())
                .unwrap_or_default();
            rows.sort_by_key(|row| row.joined_at);
            Ok(rows)
        }
        .boxed()
    }

    fn update_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        update: ParticipantUpdate,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let inner = self.inner.clone();
        async move {
            let updated = {
                let Some(mut rows) = inner.participants.get_mut(&session_id) else {
                    return Ok(None);
                };
                let Some(row) = rows.iter_mut().find(|row| row.user_id == user_id) else {
                    return Ok(None);
                };
                if update == ParticipantUpdate::ToggleReady
                    && inner.session_status(session_id) != Some(SessionStatus::Waiting)
                {
                    return Err(StorageError::Conflict(
                        "readiness can only change while waiting".into(),
                    ));
                }
                update.apply(row);
                Some(row.clone())
            };
            if updated.is_some() {
                inner.notify(ChangeTable::Participants, session_id);
            }
            Ok(updated)
        }
        .boxed()
    }

    fn remove_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let inner = self.inner.clone();
        async move {
            let removed = inner.participants.get_mut(&session_id).and_then(|mut rows| {
                let position = rows.iter().position(|row| row.user_id == user_id)?;
                Some(rows.remove(position))
            });
            if removed.is_some() {
                inner.notify(ChangeTable::Participants, session_id);
            }
            Ok(removed)
        }
        .boxed()
    }

    fn subscribe(&self, session_id: Uuid) -> ChangeFeed {
        ChangeFeed::new(session_id, self.inner.changes.subscribe())
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        async { Ok(()) }.boxed()
    }
}
