use std::{collections::HashMap, time::SystemTime};

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            JoinOutcome, ParticipantEntity, ParticipantUpdate, SessionEntity, SessionStatus,
            StartOutcome,
        },
        storage::StorageError,
    },
    dto::{
        lobby::{
            CreateSessionRequest, JoinSessionRequest, SessionIdResponse, StartGameResponse,
            StartRefusal,
        },
        validation::JOIN_CODE_LENGTH,
    },
    error::ServiceError,
    services::{game_runner, lobby_watcher},
    state::{
        SharedState,
        game::{GameParticipant, GameSession, Quiz},
        lobby::{LobbySnapshot, MIN_READY_PLAYERS},
    },
};

/// Characters used for join codes; look-alikes (0/O, 1/I) are left out.
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_ATTEMPTS: usize = 8;

/// Host a new session of `quiz_id`; the caller becomes its first participant.
pub async fn create_session(
    state: &SharedState,
    host_id: Uuid,
    request: CreateSessionRequest,
) -> Result<SessionIdResponse, ServiceError> {
    let store = state.store();
    if store.find_quiz(request.quiz_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "quiz `{}` not found",
            request.quiz_id
        )));
    }

    let max_participants = request
        .max_participants
        .unwrap_or(state.config().default_max_participants);

    let mut attempt = 0;
    let session = loop {
        attempt += 1;
        let now = SystemTime::now();
        let session = SessionEntity {
            id: Uuid::new_v4(),
            host_id,
            join_code: generate_join_code(),
            status: SessionStatus::Waiting,
            max_participants,
            quiz_id: request.quiz_id,
            created_at: now,
            updated_at: now,
        };
        match store.insert_session(session.clone()).await {
            Ok(()) => break session,
            Err(StorageError::Conflict(message)) if attempt < JOIN_CODE_ATTEMPTS => {
                warn!(attempt, %message, "join code collision, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    };

    store
        .insert_participant(
            ParticipantEntity::new(session.id, host_id, true),
            max_participants,
        )
        .await?;

    lobby_watcher::spawn(state, session.id);
    info!(session_id = %session.id, %host_id, join_code = %session.join_code, "session created");

    Ok(SessionIdResponse {
        session_id: session.id,
        join_code: session.join_code,
    })
}

/// Join a waiting session by code. Joining twice returns the same session,
/// also once the game started.
pub async fn join_session(
    state: &SharedState,
    user_id: Uuid,
    request: JoinSessionRequest,
) -> Result<SessionIdResponse, ServiceError> {
    let store = state.store();
    let join_code = request.join_code.trim().to_ascii_uppercase();
    let Some(session) = store.find_session_by_code(join_code.clone()).await? else {
        return Err(ServiceError::NotFound(format!(
            "no session with code `{join_code}`"
        )));
    };

    match store
        .insert_participant(
            ParticipantEntity::new(session.id, user_id, false),
            session.max_participants,
        )
        .await?
    {
        JoinOutcome::Inserted => {
            info!(session_id = %session.id, %user_id, "participant joined");
        }
        JoinOutcome::AlreadyJoined => {}
        JoinOutcome::Full => {
            return Err(ServiceError::InvalidState(format!(
                "session is full ({} players)",
                session.max_participants
            )));
        }
        JoinOutcome::Closed => {
            return Err(ServiceError::InvalidState(
                "session is no longer accepting players".into(),
            ));
        }
    }

    Ok(SessionIdResponse {
        session_id: session.id,
        join_code: session.join_code,
    })
}

/// Session row plus participants in join order, with display data from profiles.
pub async fn lobby_snapshot(
    state: &SharedState,
    session_id: Uuid,
) -> Result<LobbySnapshot, ServiceError> {
    let store = state.store();
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))?;

    let rows = store.list_participants(session_id).await?;
    Ok(LobbySnapshot {
        session: GameSession::from(session),
        participants: with_profiles(state, rows).await?,
    })
}

/// Attach display data to participant rows, keeping their order.
async fn with_profiles(
    state: &SharedState,
    rows: Vec<ParticipantEntity>,
) -> Result<Vec<GameParticipant>, ServiceError> {
    let mut profiles: HashMap<Uuid, _> = state
        .store()
        .find_profiles(rows.iter().map(|row| row.user_id).collect())
        .await?
        .into_iter()
        .map(|profile| (profile.user_id, profile))
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let profile = profiles.remove(&row.user_id);
            GameParticipant::from((row, profile))
        })
        .collect())
}

/// Flip the caller's ready flag at the store and return the refreshed lobby.
pub async fn toggle_ready(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<LobbySnapshot, ServiceError> {
    let store = state.store();
    let session = require_session(state, session_id).await?;
    if session.status != SessionStatus::Waiting {
        return Err(ServiceError::InvalidState(
            "readiness can only change while waiting".into(),
        ));
    }

    let Some(row) = store
        .update_participant(session_id, user_id, ParticipantUpdate::ToggleReady)
        .await?
    else {
        return Err(not_a_participant(session_id));
    };
    info!(%session_id, %user_id, is_ready = row.is_ready, "ready toggled");

    lobby_snapshot(state, session_id).await
}

/// Start the game when the host asks and every participant is ready.
///
/// Guard failures leave everything untouched and come back as a refusal.
/// The final check and the switch to in-progress happen atomically at the
/// store, and the game runs with exactly the rows seen at that moment.
pub async fn start_game(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<StartGameResponse, ServiceError> {
    let session = require_session(state, session_id).await?;
    if session.status != SessionStatus::Waiting {
        return Ok(StartGameResponse::refused(StartRefusal::NotWaiting));
    }

    let quiz_id = session.quiz_id;
    let quiz: Quiz = state
        .store()
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{quiz_id}` not found")))?
        .into();

    let rows = match state
        .store()
        .begin_game(session_id, user_id, MIN_READY_PLAYERS)
        .await?
    {
        StartOutcome::Started(rows) => rows,
        StartOutcome::Missing => {
            return Err(ServiceError::NotFound(format!(
                "session `{session_id}` not found"
            )));
        }
        StartOutcome::NotWaiting => {
            return Ok(StartGameResponse::refused(StartRefusal::NotWaiting));
        }
        StartOutcome::NotHost => return Ok(StartGameResponse::refused(StartRefusal::NotHost)),
        StartOutcome::NotAllReady => {
            return Ok(StartGameResponse::refused(StartRefusal::NotAllReady));
        }
    };

    let mut session = GameSession::from(session);
    session.status = SessionStatus::InProgress;
    let participants = with_profiles(state, rows).await?;

    if !game_runner::launch(state, session, participants, quiz.questions) {
        return Ok(StartGameResponse::refused(StartRefusal::NotWaiting));
    }
    info!(%session_id, host_id = %user_id, "game started");

    Ok(StartGameResponse::started())
}

/// Remove the caller from the session.
///
/// A departing host of a waiting lobby hands the role to the earliest
/// remaining participant; an emptied lobby is closed.
pub async fn leave_session(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.store();
    let session = require_session(state, session_id).await?;

    let Some(removed) = store.remove_participant(session_id, user_id).await? else {
        return Err(not_a_participant(session_id));
    };
    info!(%session_id, %user_id, "participant left");

    if session.status != SessionStatus::Waiting {
        return Ok(());
    }

    let remaining = store.list_participants(session_id).await?;
    match remaining.first() {
        None => {
            store
                .update_session_status(session_id, SessionStatus::Completed)
                .await?;
            info!(%session_id, "empty lobby closed");
        }
        Some(successor) if removed.is_host => {
            store
                .update_participant(session_id, successor.user_id, ParticipantUpdate::SetHost(true))
                .await?;
            store
                .update_session_host(session_id, successor.user_id)
                .await?;
            info!(%session_id, new_host = %successor.user_id, "host handed over");
        }
        Some(_) => {}
    }

    Ok(())
}

async fn require_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    state
        .store()
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))
}

fn not_a_participant(session_id: Uuid) -> ServiceError {
    ServiceError::Forbidden(format!("not a participant of session `{session_id}`"))
}

fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            lobby_store::MemoryStore,
            models::{QuestionEntity, QuizEntity},
        },
        dto::validation::validate_join_code,
        state::AppState,
    };

    async fn setup() -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default(), Arc::new(MemoryStore::default()));
        let quiz = QuizEntity {
            id: Uuid::new_v4(),
            title: "Rivers".into(),
            questions: vec![QuestionEntity {
                id: Uuid::new_v4(),
                text: "Longest river?".into(),
                options: vec!["Nile".into(), "Seine".into()],
                correct_index: 0,
                explanation: None,
                difficulty: None,
                topics: vec![],
            }],
            created_at: SystemTime::now(),
        };
        let quiz_id = quiz.id;
        state.store().save_quiz(quiz).await.unwrap();
        (state, quiz_id)
    }

    async fn host_session(state: &SharedState, quiz_id: Uuid, max: Option<u32>) -> (Uuid, SessionIdResponse) {
        let host = Uuid::new_v4();
        let created = create_session(
            state,
            host,
            CreateSessionRequest {
                quiz_id,
                max_participants: max,
            },
        )
        .await
        .unwrap();
        (host, created)
    }

    async fn join(state: &SharedState, code: &str) -> (Uuid, Result<SessionIdResponse, ServiceError>) {
        let user = Uuid::new_v4();
        let result = join_session(
            state,
            user,
            JoinSessionRequest {
                join_code: code.to_string(),
            },
        )
        .await;
        (user, result)
    }

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..32 {
            let code = generate_join_code();
            assert!(validate_join_code(&code).is_ok());
            assert!(!code.contains('O') && !code.contains('0'));
        }
    }

    #[tokio::test]
    async fn host_becomes_first_participant() {
        let (state, quiz_id) = setup().await;
        let (host, created) = host_session(&state, quiz_id, None).await;

        let snapshot = lobby_snapshot(&state, created.session_id).await.unwrap();
        assert_eq!(snapshot.session.host_id, host);
        assert_eq!(snapshot.session.status, SessionStatus::Waiting);
        assert_eq!(snapshot.session.max_participants, 10);
        assert!(snapshot.is_host(host));
        assert_eq!(snapshot.participants.len(), 1);
        assert!(state.watchers().contains_key(&created.session_id));
    }

    #[tokio::test]
    async fn unknown_quiz_cannot_be_hosted() {
        let (state, _) = setup().await;
        let err = create_session(
            &state,
            Uuid::new_v4(),
            CreateSessionRequest {
                quiz_id: Uuid::new_v4(),
                max_participants: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn joining_is_case_insensitive_and_idempotent() {
        let (state, quiz_id) = setup().await;
        let (_, created) = host_session(&state, quiz_id, None).await;

        let user = Uuid::new_v4();
        let request = || JoinSessionRequest {
            join_code: created.join_code.to_lowercase(),
        };
        let first = join_session(&state, user, request()).await.unwrap();
        let second = join_session(&state, user, request()).await.unwrap();

        assert_eq!(first.session_id, created.session_id);
        assert_eq!(second.session_id, created.session_id);
        let snapshot = lobby_snapshot(&state, created.session_id).await.unwrap();
        assert_eq!(snapshot.participants.len(), 2);
    }

    #[tokio::test]
    async fn full_sessions_reject_new_players() {
        let (state, quiz_id) = setup().await;
        let (_, created) = host_session(&state, quiz_id, Some(2)).await;

        let (_, joined) = join(&state, &created.join_code).await;
        assert!(joined.is_ok());
        let (_, rejected) = join(&state, &created.join_code).await;
        assert!(matches!(rejected, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let (state, _) = setup().await;
        let (_, result) = join(&state, "ZZZZZZ").await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn toggling_ready_twice_restores_flag() {
        let (state, quiz_id) = setup().await;
        let (host, created) = host_session(&state, quiz_id, None).await;

        let once = toggle_ready(&state, created.session_id, host).await.unwrap();
        assert!(once.participant(host).unwrap().is_ready);
        let twice = toggle_ready(&state, created.session_id, host).await.unwrap();
        assert!(!twice.participant(host).unwrap().is_ready);
    }

    #[tokio::test]
    async fn strangers_cannot_toggle_ready() {
        let (state, quiz_id) = setup().await;
        let (_, created) = host_session(&state, quiz_id, None).await;
        let err = toggle_ready(&state, created.session_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn only_a_ready_host_lobby_starts() {
        let (state, quiz_id) = setup().await;
        let (host, created) = host_session(&state, quiz_id, None).await;
        let session_id = created.session_id;

        let refused = start_game(&state, session_id, host).await.unwrap();
        assert_eq!(refused.reason, Some(StartRefusal::NotAllReady));

        let (guest, _) = join(&state, &created.join_code).await;
        toggle_ready(&state, session_id, host).await.unwrap();
        toggle_ready(&state, session_id, guest).await.unwrap();

        let refused = start_game(&state, session_id, guest).await.unwrap();
        assert_eq!(refused.reason, Some(StartRefusal::NotHost));

        let started = start_game(&state, session_id, host).await.unwrap();
        assert!(started.started);
        let snapshot = lobby_snapshot(&state, session_id).await.unwrap();
        assert_eq!(snapshot.session.status, SessionStatus::InProgress);
        assert!(state.games().contains_key(&session_id));

        let again = start_game(&state, session_id, host).await.unwrap();
        assert_eq!(again.reason, Some(StartRefusal::NotWaiting));

        state.shutdown();
    }

    #[tokio::test]
    async fn started_games_only_let_existing_players_back_in() {
        let (state, quiz_id) = setup().await;
        let (host, created) = host_session(&state, quiz_id, None).await;
        let session_id = created.session_id;
        let (guest, _) = join(&state, &created.join_code).await;
        toggle_ready(&state, session_id, host).await.unwrap();
        toggle_ready(&state, session_id, guest).await.unwrap();
        assert!(start_game(&state, session_id, host).await.unwrap().started);

        let (_, late) = join(&state, &created.join_code).await;
        assert!(matches!(late, Err(ServiceError::InvalidState(_))));
        let back = join_session(
            &state,
            guest,
            JoinSessionRequest {
                join_code: created.join_code.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(back.session_id, session_id);

        let frozen = toggle_ready(&state, session_id, guest).await.unwrap_err();
        assert!(matches!(frozen, ServiceError::InvalidState(_)));

        state.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn start_racing_a_ready_toggle_never_runs_an_unready_player() {
        for _ in 0..100 {
            let (state, quiz_id) = setup().await;
            let (host, created) = host_session(&state, quiz_id, None).await;
            let session_id = created.session_id;
            let (guest, _) = join(&state, &created.join_code).await;
            toggle_ready(&state, session_id, host).await.unwrap();
            toggle_ready(&state, session_id, guest).await.unwrap();

            let starter = {
                let state = state.clone();
                tokio::spawn(async move { start_game(&state, session_id, host).await })
            };
            let toggler = {
                let state = state.clone();
                tokio::spawn(async move { toggle_ready(&state, session_id, guest).await })
            };
            let started = starter.await.unwrap().unwrap();
            let toggled = toggler.await.unwrap();

            let rows = state.store().list_participants(session_id).await.unwrap();
            let guest_ready = rows.iter().any(|row| row.user_id == guest && row.is_ready);
            if started.started {
                assert!(guest_ready, "game started with an unready participant");
                assert!(toggled.is_err());
                let view = game_runner::game_view(&state, session_id, None).await.unwrap();
                assert_eq!(view.leaderboard.len(), 2);
            } else {
                assert_eq!(started.reason, Some(StartRefusal::NotAllReady));
                assert!(!guest_ready);
            }
            state.shutdown();
        }
    }

    #[tokio::test]
    async fn departing_host_hands_over_to_earliest_participant() {
        let (state, quiz_id) = setup().await;
        let (host, created) = host_session(&state, quiz_id, None).await;
        let session_id = created.session_id;
        let (first, _) = join(&state, &created.join_code).await;
        let (_second, _) = join(&state, &created.join_code).await;

        leave_session(&state, session_id, host).await.unwrap();

        let snapshot = lobby_snapshot(&state, session_id).await.unwrap();
        assert_eq!(snapshot.session.host_id, first);
        assert!(snapshot.is_host(first));
        assert_eq!(snapshot.participants.len(), 2);
    }

    #[tokio::test]
    async fn last_leaver_closes_the_lobby() {
        let (state, quiz_id) = setup().await;
        let (host, created) = host_session(&state, quiz_id, None).await;

        leave_session(&state, created.session_id, host).await.unwrap();

        let snapshot = lobby_snapshot(&state, created.session_id).await.unwrap();
        assert_eq!(snapshot.session.status, SessionStatus::Completed);
        assert!(snapshot.participants.is_empty());

        let err = leave_session(&state, created.session_id, host)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
