use std::{sync::Arc, time::Duration};

use dashmap::mapref::entry::Entry;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{ParticipantUpdate, SessionStatus},
    dto::game::{GameStateView, SubmitAnswerResponse},
    error::ServiceError,
    services::{lobby_service, sse_events},
    state::{
        RunningGame, SharedState,
        game::{GameParticipant, GameSession, QuizQuestion},
        state_machine::{GamePhase, GameState, TickOutcome},
    },
};

const TICK: Duration = Duration::from_secs(1);

/// Register a game for `session` and start its phase timer.
///
/// Returns `false` when the session already has a game.
pub fn launch(
    state: &SharedState,
    session: GameSession,
    participants: Vec<GameParticipant>,
    questions: Vec<QuizQuestion>,
) -> bool {
    let session_id = session.id;
    let durations = state.config().phase_durations;
    let cancel = state.child_token();

    let game = match state.games().entry(session_id) {
        Entry::Occupied(_) => {
            warn!(%session_id, "game already running");
            return false;
        }
        Entry::Vacant(slot) => {
            let game = Arc::new(RunningGame::new(
                GameState::new(session, participants, questions, durations),
                cancel.clone(),
            ));
            slot.insert(game.clone());
            game
        }
    };

    let state = state.clone();
    tokio::spawn(async move {
        run(state, session_id, game, cancel).await;
    });
    true
}

async fn run(state: SharedState, session_id: Uuid, game: Arc<RunningGame>, cancel: CancellationToken) {
    {
        let mut guard = game.state().write().await;
        guard.begin();
        info!(
            %session_id,
            questions = guard.question_count(),
            players = guard.participants().len(),
            "game timer started"
        );
        sse_events::broadcast_phase_changed(&state, &guard);
    }

    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    let finished = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(%session_id, "game timer cancelled");
                break false;
            }
            _ = ticker.tick() => {
                let mut guard = game.state().write().await;
                match guard.tick() {
                    TickOutcome::Idle => break guard.is_finished(),
                    TickOutcome::Counting { .. } => sse_events::broadcast_tick(&state, &guard),
                    TickOutcome::Advanced { from, to } => {
                        debug!(%session_id, ?from, ?to, "phase advanced");
                        sse_events::broadcast_phase_changed(&state, &guard);
                        if to == GamePhase::Finished {
                            sse_events::broadcast_game_finished(&state, &guard);
                            break true;
                        }
                    }
                }
            }
        }
    };

    if finished {
        match state
            .store()
            .update_session_status(session_id, SessionStatus::Completed)
            .await
        {
            Ok(true) => info!(%session_id, "game finished"),
            Ok(false) => warn!(%session_id, "finished game has no session row"),
            Err(err) => warn!(%session_id, error = %err, "failed to mark session completed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = sleep(state.config().finished_game_retention) => {}
        }
    }

    // a relaunch may have replaced the entry; only drop our own game
    if state
        .games()
        .remove_if(&session_id, |_, running| Arc::ptr_eq(running, &game))
        .is_some()
    {
        debug!(%session_id, "game state released");
    }
}

/// Record the caller's option for the open question.
///
/// Submissions the game ignores (wrong phase, second answer, stranger,
/// unknown option) are reported as not accepted.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
    option_index: usize,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let game = state.running_game(session_id)?;

    let outcome = {
        let mut guard = game.state().write().await;
        let Some(outcome) = guard.select_answer(user_id, option_index) else {
            debug!(%session_id, %user_id, option_index, phase = ?guard.phase(), "answer ignored");
            return Ok(SubmitAnswerResponse::ignored());
        };
        sse_events::broadcast_answer_received(state, &guard, &outcome);
        outcome
    };

    let persisted = state
        .store()
        .update_participant(
            session_id,
            user_id,
            ParticipantUpdate::Score {
                score: outcome.score,
                streak: outcome.streak,
            },
        )
        .await;
    match persisted {
        Ok(Some(_)) => {}
        Ok(None) => warn!(%session_id, %user_id, "answering participant has no row"),
        Err(err) => warn!(%session_id, %user_id, error = %err, "failed to persist score"),
    }

    info!(
        %session_id,
        %user_id,
        question_index = outcome.question_index,
        correct = outcome.record.correct,
        points = outcome.record.points,
        "answer recorded"
    );
    Ok((&outcome).into())
}

/// Current game view, personalised with the viewer's own answer.
///
/// Once a completed game's state has been released the final standings are
/// rebuilt from the stored participant scores.
pub async fn game_view(
    state: &SharedState,
    session_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<GameStateView, ServiceError> {
    let running = state.games().get(&session_id).map(|entry| entry.value().clone());
    match running {
        Some(game) => {
            let guard = game.state().read().await;
            Ok(GameStateView::build(&guard, viewer))
        }
        None => stored_final_view(state, session_id).await,
    }
}

async fn stored_final_view(
    state: &SharedState,
    session_id: Uuid,
) -> Result<GameStateView, ServiceError> {
    let snapshot = lobby_service::lobby_snapshot(state, session_id).await?;
    // abandoned lobbies complete too, but never had players left to rank
    if snapshot.session.status != SessionStatus::Completed || snapshot.participants.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "no game for session `{session_id}`"
        )));
    }

    let question_count = state
        .store()
        .find_quiz(snapshot.session.quiz_id)
        .await?
        .map_or(0, |quiz| quiz.questions.len());
    Ok(GameStateView::finished(
        session_id,
        question_count,
        &snapshot.participants,
    ))
}
