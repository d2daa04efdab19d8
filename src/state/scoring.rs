//! Points and streak rules applied when an answer is submitted.

/// Flat reward for any correct answer.
pub const BASE_POINTS: u32 = 100;
/// Bonus per second still on the clock when a correct answer lands.
pub const POINTS_PER_SECOND: u32 = 10;

/// Points awarded for an answer given with `seconds_remaining` left on the question timer.
pub fn points(correct: bool, seconds_remaining: u32) -> u32 {
    if correct {
        BASE_POINTS + POINTS_PER_SECOND * seconds_remaining
    } else {
        0
    }
}

/// Streak after an answer: extended by a correct one, reset by a wrong one.
pub fn next_streak(previous: u32, correct: bool) -> u32 {
    if correct { previous + 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_answer_with_seven_seconds_left() {
        assert_eq!(points(true, 7), 170);
    }

    #[test]
    fn correct_answer_with_no_time_left_scores_base() {
        assert_eq!(points(true, 0), 100);
        assert_eq!(points(true, 10), 200);
    }

    #[test]
    fn incorrect_answer_scores_nothing() {
        assert_eq!(points(false, 9), 0);
        assert_eq!(points(false, 0), 0);
    }

    #[test]
    fn streak_grows_then_resets() {
        let mut streak = 0;
        for _ in 0..4 {
            streak = next_streak(streak, true);
        }
        assert_eq!(streak, 4);
        assert_eq!(next_streak(streak, false), 0);
        assert_eq!(next_streak(0, false), 0);
    }
}
