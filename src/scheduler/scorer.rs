use chrono::{DateTime, Utc};

use super::config::ScoringConfig;
use super::types::{Answer, MasteryRecord};

/// Float slack for the mastery threshold, so 0.3 - 0.2 still counts as 0.1.
const THRESHOLD_EPSILON: f64 = 1e-9;

pub fn answer_weight(answer: Answer, config: &ScoringConfig) -> f64 {
    if answer.is_first_try {
        1.0
    } else {
        config.retry_weight
    }
}

/// Applies one answer to `record` in place.
///
/// Difficulty stays in [0, 1]. The streak grows only on a correct first try
/// and any mistake clears both the streak and mastery. `mistake_delta` is set
/// to the increment the store must add (0 or 1).
pub fn apply_answer(
    record: &mut MasteryRecord,
    answer: Answer,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) {
    let weight = answer_weight(answer, config);
    let difficulty = clamp_difficulty(record.difficulty);

    if answer.is_correct {
        record.difficulty = clamp_difficulty(difficulty - config.improvement_step * weight);
        if answer.is_first_try {
            record.correct_streak = record.correct_streak.saturating_add(1);
        }
        if reaches_mastery(record, config) {
            record.is_mastered = true;
        }
        record.mistake_delta = 0;
    } else {
        record.is_mastered = false;
        record.difficulty = clamp_difficulty(difficulty + config.penalty_step * weight);
        record.correct_streak = 0;
        record.mistake_delta = 1;
    }

    record.last_seen_at = now;
}

/// Forced mastery: difficulty zeroed, streak kept.
pub fn apply_mastered(record: &mut MasteryRecord, now: DateTime<Utc>) {
    record.is_mastered = true;
    record.difficulty = 0.0;
    record.mistake_delta = 0;
    record.last_seen_at = now;
}

fn reaches_mastery(record: &MasteryRecord, config: &ScoringConfig) -> bool {
    record.difficulty <= config.mastery_difficulty + THRESHOLD_EPSILON
        && record.correct_streak >= config.mastery_streak
}

fn clamp_difficulty(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const FIRST_CORRECT: Answer = Answer {
        is_correct: true,
        is_first_try: true,
    };
    const RETRY_CORRECT: Answer = Answer {
        is_correct: true,
        is_first_try: false,
    };
    const FIRST_WRONG: Answer = Answer {
        is_correct: false,
        is_first_try: true,
    };
    const RETRY_WRONG: Answer = Answer {
        is_correct: false,
        is_first_try: false,
    };

    fn record(difficulty: f64, streak: u32) -> MasteryRecord {
        let mut r = MasteryRecord::fresh(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        r.difficulty = difficulty;
        r.correct_streak = streak;
        r
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_correct_first_try_below_threshold_not_mastered() {
        let mut r = record(0.5, 1);
        apply_answer(&mut r, FIRST_CORRECT, &ScoringConfig::default(), Utc::now());
        assert!(approx(r.difficulty, 0.3));
        assert_eq!(r.correct_streak, 2);
        assert!(!r.is_mastered);
        assert_eq!(r.mistake_delta, 0);
    }

    #[test]
    fn test_correct_first_try_reaches_mastery() {
        let mut r = record(0.3, 2);
        apply_answer(&mut r, FIRST_CORRECT, &ScoringConfig::default(), Utc::now());
        assert!(approx(r.difficulty, 0.1));
        assert_eq!(r.correct_streak, 3);
        assert!(r.is_mastered);
    }

    #[test]
    fn test_wrong_answer_resets_mastered_word() {
        let mut r = record(0.1, 3);
        r.is_mastered = true;
        apply_answer(&mut r, FIRST_WRONG, &ScoringConfig::default(), Utc::now());
        assert!(approx(r.difficulty, 0.4));
        assert_eq!(r.correct_streak, 0);
        assert!(!r.is_mastered);
        assert_eq!(r.mistake_delta, 1);
    }

    #[test]
    fn test_retry_half_weight_keeps_streak() {
        let mut r = record(0.5, 0);
        apply_answer(&mut r, RETRY_CORRECT, &ScoringConfig::default(), Utc::now());
        assert!(approx(r.difficulty, 0.4));
        assert_eq!(r.correct_streak, 0);
    }

    #[test]
    fn test_retry_never_masters_on_difficulty_alone() {
        let mut r = record(0.0, 1);
        apply_answer(&mut r, RETRY_CORRECT, &ScoringConfig::default(), Utc::now());
        assert_eq!(r.difficulty, 0.0);
        assert_eq!(r.correct_streak, 1);
        assert!(!r.is_mastered);
    }

    #[test]
    fn test_retry_wrong_half_penalty() {
        let mut r = record(0.2, 4);
        apply_answer(&mut r, RETRY_WRONG, &ScoringConfig::default(), Utc::now());
        assert!(approx(r.difficulty, 0.35));
        assert_eq!(r.correct_streak, 0);
        assert_eq!(r.mistake_delta, 1);
    }

    #[test]
    fn test_difficulty_clamped_at_bounds() {
        let mut high = record(0.9, 0);
        apply_answer(&mut high, FIRST_WRONG, &ScoringConfig::default(), Utc::now());
        assert_eq!(high.difficulty, 1.0);

        let mut low = record(0.05, 0);
        apply_answer(&mut low, FIRST_CORRECT, &ScoringConfig::default(), Utc::now());
        assert_eq!(low.difficulty, 0.0);
    }

    #[test]
    fn test_out_of_range_input_is_clamped_first() {
        let mut r = record(7.0, 0);
        apply_answer(&mut r, FIRST_CORRECT, &ScoringConfig::default(), Utc::now());
        assert!(approx(r.difficulty, 0.8));
    }

    #[test]
    fn test_mark_mastered_overrides_everything() {
        let mut r = record(0.9, 0);
        r.mistake_delta = 1;
        let now = Utc::now();
        apply_mastered(&mut r, now);
        assert!(r.is_mastered);
        assert_eq!(r.difficulty, 0.0);
        assert_eq!(r.mistake_delta, 0);
        assert_eq!(r.correct_streak, 0);
        assert_eq!(r.last_seen_at, now);
    }
}
