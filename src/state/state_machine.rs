use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    game::{GameParticipant, GameSession, QuizQuestion},
    scoring,
};

/// Phases a running game cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Setup has not completed yet.
    Loading,
    /// Short countdown before the first question.
    GetReady,
    /// A question is open for answers.
    Question,
    /// The correct option is shown.
    AnswerReveal,
    /// Standings are shown between questions.
    Leaderboard,
    /// Terminal phase; no more questions.
    Finished,
}

/// Countdown lengths, in seconds, for each timed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub get_ready: u32,
    pub question: u32,
    pub answer_reveal: u32,
    pub leaderboard: u32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            get_ready: 5,
            question: 10,
            answer_reveal: 5,
            leaderboard: 5,
        }
    }
}

impl PhaseDurations {
    /// Full countdown for `phase`; untimed phases have none.
    pub fn for_phase(&self, phase: GamePhase) -> u32 {
        match phase {
            GamePhase::GetReady => self.get_ready,
            GamePhase::Question => self.question,
            GamePhase::AnswerReveal => self.answer_reveal,
            GamePhase::Leaderboard => self.leaderboard,
            GamePhase::Loading | GamePhase::Finished => 0,
        }
    }
}

/// Answer recorded for one participant on the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub option_index: usize,
    pub correct: bool,
    pub points: u32,
    /// Countdown value when the answer was accepted.
    pub seconds_remaining: u32,
}

/// Result of an accepted answer, carrying the participant's updated totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub question_index: usize,
    pub record: AnswerRecord,
    pub score: u32,
    pub streak: u32,
}

/// What a single timer tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Game is loading or finished; nothing counts down.
    Idle,
    /// Countdown decremented without leaving the phase.
    Counting { remaining: u32 },
    /// Countdown hit zero and the game moved on.
    Advanced { from: GamePhase, to: GamePhase },
}

/// In-memory state of one running game.
///
/// The engine is a plain value: timers and persistence live in the caller,
/// which feeds it one [`GameState::tick`] per second.
#[derive(Debug, Clone)]
pub struct GameState {
    session: GameSession,
    participants: Vec<GameParticipant>,
    questions: Vec<QuizQuestion>,
    durations: PhaseDurations,
    phase: GamePhase,
    time_remaining: u32,
    current_index: usize,
    answers: HashMap<Uuid, AnswerRecord>,
}

impl GameState {
    /// Create a game in [`GamePhase::Loading`].
    pub fn new(
        session: GameSession,
        participants: Vec<GameParticipant>,
        questions: Vec<QuizQuestion>,
        durations: PhaseDurations,
    ) -> Self {
        Self {
            session,
            participants,
            questions,
            durations,
            phase: GamePhase::Loading,
            time_remaining: 0,
            current_index: 0,
            answers: HashMap::new(),
        }
    }

    /// Leave loading and start the get-ready countdown. Returns `false` if already begun.
    pub fn begin(&mut self) -> bool {
        if self.phase != GamePhase::Loading {
            return false;
        }
        self.enter(GamePhase::GetReady);
        true
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if matches!(self.phase, GamePhase::Loading | GamePhase::Finished) {
            return TickOutcome::Idle;
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return TickOutcome::Counting {
                remaining: self.time_remaining,
            };
        }

        let from = self.phase;
        let to = self.next_phase();
        self.enter(to);
        TickOutcome::Advanced { from, to }
    }

    /// Record `user_id`'s choice for the open question.
    ///
    /// Returns `None` without touching state when the question is not open,
    /// the user is not a participant, the option does not exist, or the user
    /// already answered this question.
    pub fn select_answer(&mut self, user_id: Uuid, option_index: usize) -> Option<AnswerOutcome> {
        if self.phase != GamePhase::Question || self.answers.contains_key(&user_id) {
            return None;
        }
        let question = self.questions.get(self.current_index)?;
        if option_index >= question.options.len() {
            return None;
        }
        let participant = self
            .participants
            .iter_mut()
            .find(|participant| participant.user_id == user_id)?;

        let correct = question.is_correct(option_index);
        let points = scoring::points(correct, self.time_remaining);
        participant.score += points;
        participant.streak = scoring::next_streak(participant.streak, correct);

        let record = AnswerRecord {
            option_index,
            correct,
            points,
            seconds_remaining: self.time_remaining,
        };
        self.answers.insert(user_id, record);

        Some(AnswerOutcome {
            user_id,
            question_id: question.id,
            question_index: self.current_index,
            record,
            score: participant.score,
            streak: participant.streak,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Seconds left in the current phase.
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Session this game belongs to.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[GameParticipant] {
        &self.participants
    }

    /// Number of questions in the game.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Pointer into the question list; equals the count once finished.
    pub fn question_index(&self) -> usize {
        self.current_index
    }

    /// The question on screen, only while it is open or being revealed.
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            GamePhase::Question | GamePhase::AnswerReveal => self.questions.get(self.current_index),
            _ => None,
        }
    }

    /// Recorded answer of `user_id` for the question on screen.
    pub fn answer_for(&self, user_id: Uuid) -> Option<&AnswerRecord> {
        self.current_question()?;
        self.answers.get(&user_id)
    }

    /// How many participants answered the question on screen.
    pub fn answered_count(&self) -> usize {
        match self.current_question() {
            Some(_) => self.answers.len(),
            None => 0,
        }
    }

    /// Participants ordered by score (highest first), ties broken by name.
    pub fn leaderboard(&self) -> Vec<&GameParticipant> {
        rank_by_score(&self.participants)
    }

    /// Whether the terminal phase was reached.
    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    fn next_phase(&mut self) -> GamePhase {
        match self.phase {
            GamePhase::GetReady if self.questions.is_empty() => GamePhase::Finished,
            GamePhase::GetReady => GamePhase::Question,
            GamePhase::Question => GamePhase::AnswerReveal,
            GamePhase::AnswerReveal => {
                self.current_index += 1;
                if self.current_index < self.questions.len() {
                    GamePhase::Leaderboard
                } else {
                    GamePhase::Finished
                }
            }
            GamePhase::Leaderboard => GamePhase::Question,
            GamePhase::Loading | GamePhase::Finished => self.phase,
        }
    }

    fn enter(&mut self, phase: GamePhase) {
        if phase == GamePhase::Question {
            self.answers.clear();
        }
        self.phase = phase;
        self.time_remaining = self.durations.for_phase(phase);
    }
}

/// Highest score first; ties ordered by username.
pub fn rank_by_score<'a>(
    participants: impl IntoIterator<Item = &'a GameParticipant>,
) -> Vec<&'a GameParticipant> {
    let mut ranked: Vec<&GameParticipant> = participants.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.username.cmp(&b.username))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::game::SessionStatus;

    fn session() -> GameSession {
        let now = SystemTime::now();
        GameSession {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            join_code: "ABC234".into(),
            status: SessionStatus::InProgress,
            max_participants: 8,
            quiz_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn participant(name: &str) -> GameParticipant {
        GameParticipant {
            user_id: Uuid::new_v4(),
            username: name.into(),
            avatar_url: None,
            score: 0,
            is_ready: true,
            is_host: false,
            streak: 0,
            joined_at: SystemTime::now(),
        }
    }

    fn question(correct_index: usize) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            text: "2 + 2 = ?".into(),
            options: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            correct_index,
            explanation: None,
            difficulty: None,
            topics: vec![],
        }
    }

    fn game(question_count: usize) -> (GameState, Vec<Uuid>) {
        let players = vec![participant("ada"), participant("bob")];
        let ids = players.iter().map(|p| p.user_id).collect();
        let questions = (0..question_count).map(|_| question(1)).collect();
        let state = GameState::new(session(), players, questions, PhaseDurations::default());
        (state, ids)
    }

    fn run_ticks(state: &mut GameState, count: u32) -> TickOutcome {
        let mut last = TickOutcome::Idle;
        for _ in 0..count {
            last = state.tick();
        }
        last
    }

    #[test]
    fn starts_loading_and_ignores_ticks() {
        let (mut state, _) = game(2);
        assert_eq!(state.phase(), GamePhase::Loading);
        assert_eq!(state.tick(), TickOutcome::Idle);
        assert!(state.begin());
        assert!(!state.begin());
        assert_eq!(state.phase(), GamePhase::GetReady);
        assert_eq!(state.time_remaining(), 5);
    }

    #[test]
    fn question_lasts_exactly_its_duration() {
        let (mut state, _) = game(2);
        state.begin();
        run_ticks(&mut state, 5);
        assert_eq!(state.phase(), GamePhase::Question);
        assert_eq!(state.time_remaining(), 10);

        assert_eq!(
            run_ticks(&mut state, 9),
            TickOutcome::Counting { remaining: 1 }
        );
        assert_eq!(state.phase(), GamePhase::Question);
        assert_eq!(
            state.tick(),
            TickOutcome::Advanced {
                from: GamePhase::Question,
                to: GamePhase::AnswerReveal,
            }
        );
        assert_eq!(state.time_remaining(), 5);
    }

    #[test]
    fn full_cycle_through_two_questions() {
        let (mut state, _) = game(2);
        state.begin();

        let mut visited = vec![state.phase()];
        while !state.is_finished() {
            if let TickOutcome::Advanced { to, .. } = state.tick() {
                visited.push(to);
            }
        }

        assert_eq!(
            visited,
            vec![
                GamePhase::GetReady,
                GamePhase::Question,
                GamePhase::AnswerReveal,
                GamePhase::Leaderboard,
                GamePhase::Question,
                GamePhase::AnswerReveal,
                GamePhase::Finished,
            ]
        );
        assert_eq!(state.question_index(), 2);
        assert_eq!(state.tick(), TickOutcome::Idle);
    }

    #[test]
    fn last_reveal_goes_straight_to_finished() {
        let (mut state, _) = game(1);
        state.begin();
        run_ticks(&mut state, 5 + 10);
        assert_eq!(state.phase(), GamePhase::AnswerReveal);
        assert_eq!(
            run_ticks(&mut state, 5),
            TickOutcome::Advanced {
                from: GamePhase::AnswerReveal,
                to: GamePhase::Finished,
            }
        );
        assert!(state.current_question().is_none());
    }

    #[test]
    fn empty_quiz_finishes_after_get_ready() {
        let (mut state, _) = game(0);
        state.begin();
        assert_eq!(
            run_ticks(&mut state, 5),
            TickOutcome::Advanced {
                from: GamePhase::GetReady,
                to: GamePhase::Finished,
            }
        );
    }

    #[test]
    fn correct_answer_scores_by_time_remaining() {
        let (mut state, ids) = game(1);
        state.begin();
        run_ticks(&mut state, 5 + 3);
        assert_eq!(state.time_remaining(), 7);

        let outcome = state.select_answer(ids[0], 1).unwrap();
        assert!(outcome.record.correct);
        assert_eq!(outcome.record.points, 170);
        assert_eq!(outcome.score, 170);
        assert_eq!(outcome.streak, 1);
        assert_eq!(state.answer_for(ids[0]).map(|r| r.option_index), Some(1));
        assert_eq!(state.answered_count(), 1);
    }

    #[test]
    fn incorrect_answer_resets_streak() {
        let (mut state, ids) = game(3);
        state.begin();
        run_ticks(&mut state, 5);
        state.select_answer(ids[0], 1).unwrap();
        // reveal + leaderboard + remaining question time
        run_ticks(&mut state, 10 + 5 + 5);
        assert_eq!(state.phase(), GamePhase::Question);
        let second = state.select_answer(ids[0], 1).unwrap();
        assert_eq!(second.streak, 2);

        run_ticks(&mut state, 10 + 5 + 5);
        let third = state.select_answer(ids[0], 0).unwrap();
        assert!(!third.record.correct);
        assert_eq!(third.record.points, 0);
        assert_eq!(third.streak, 0);
        assert_eq!(third.score, second.score);
    }

    #[test]
    fn second_answer_is_ignored() {
        let (mut state, ids) = game(1);
        state.begin();
        run_ticks(&mut state, 5);
        let first = state.select_answer(ids[0], 0).unwrap();
        assert_eq!(state.select_answer(ids[0], 1), None);
        assert_eq!(state.participants()[0].score, first.score);
        assert_eq!(state.answer_for(ids[0]).map(|r| r.option_index), Some(0));
    }

    #[test]
    fn answers_outside_question_phase_are_ignored() {
        let (mut state, ids) = game(1);
        assert_eq!(state.select_answer(ids[0], 1), None);
        state.begin();
        assert_eq!(state.select_answer(ids[0], 1), None);
        run_ticks(&mut state, 5 + 10);
        assert_eq!(state.phase(), GamePhase::AnswerReveal);
        assert_eq!(state.select_answer(ids[0], 1), None);
        assert!(state.participants().iter().all(|p| p.score == 0));
    }

    #[test]
    fn strangers_and_bad_options_are_ignored() {
        let (mut state, ids) = game(1);
        state.begin();
        run_ticks(&mut state, 5);
        assert_eq!(state.select_answer(Uuid::new_v4(), 1), None);
        assert_eq!(state.select_answer(ids[1], 4), None);
        // A rejected option does not consume the participant's answer.
        assert!(state.select_answer(ids[1], 1).is_some());
    }

    #[test]
    fn answers_reset_for_each_question() {
        let (mut state, ids) = game(2);
        state.begin();
        run_ticks(&mut state, 5);
        state.select_answer(ids[0], 1).unwrap();
        run_ticks(&mut state, 10 + 5 + 5);
        assert_eq!(state.phase(), GamePhase::Question);
        assert_eq!(state.question_index(), 1);
        assert!(state.answer_for(ids[0]).is_none());
        assert!(state.select_answer(ids[0], 1).is_some());
    }

    #[test]
    fn leaderboard_orders_by_score_then_name() {
        let (mut state, ids) = game(1);
        state.begin();
        run_ticks(&mut state, 5);
        state.select_answer(ids[1], 1).unwrap();
        let ranked: Vec<&str> = state
            .leaderboard()
            .iter()
            .map(|p| p.username.as_str())
            .collect();
        assert_eq!(ranked, vec!["bob", "ada"]);
    }
}
