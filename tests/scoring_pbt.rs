//! Property-based tests for answer scoring.
//!
//! - Difficulty stays in [0, 1] for any start value and answer sequence
//! - A correct answer masters iff difficulty <= threshold and streak >= threshold
//! - An incorrect answer always clears streak and mastery
//! - A corrected retry never grows the streak

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use words_backend::scheduler::scorer::{apply_answer, apply_mastered};
use words_backend::scheduler::{Answer, MasteryRecord, ScoringConfig};

fn arb_answer() -> impl Strategy<Value = Answer> {
    (any::<bool>(), any::<bool>()).prop_map(|(is_correct, is_first_try)| Answer {
        is_correct,
        is_first_try,
    })
}

fn arb_record() -> impl Strategy<Value = MasteryRecord> {
    (-2.0f64..=3.0f64, 0u32..20u32, any::<bool>()).prop_map(|(difficulty, streak, mastered)| {
        let mut record = MasteryRecord::fresh(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        record.difficulty = difficulty;
        record.correct_streak = streak;
        record.is_mastered = mastered;
        record
    })
}

proptest! {
    #[test]
    fn prop_difficulty_always_in_unit_range(
        mut record in arb_record(),
        answers in prop::collection::vec(arb_answer(), 1..40),
    ) {
        let config = ScoringConfig::default();
        for answer in answers {
            apply_answer(&mut record, answer, &config, Utc::now());
            prop_assert!((0.0..=1.0).contains(&record.difficulty));
            prop_assert!(record.mistake_delta <= 1);
        }
    }

    #[test]
    fn prop_incorrect_resets_streak_and_mastery(
        mut record in arb_record(),
        is_first_try in any::<bool>(),
    ) {
        let answer = Answer { is_correct: false, is_first_try };
        apply_answer(&mut record, answer, &ScoringConfig::default(), Utc::now());
        prop_assert_eq!(record.correct_streak, 0);
        prop_assert!(!record.is_mastered);
        prop_assert_eq!(record.mistake_delta, 1);
    }

    #[test]
    fn prop_correct_mastery_matches_thresholds(mut record in arb_record()) {
        record.is_mastered = false;
        let config = ScoringConfig::default();
        let answer = Answer { is_correct: true, is_first_try: true };
        apply_answer(&mut record, answer, &config, Utc::now());

        let expected = record.difficulty <= config.mastery_difficulty + 1e-9
            && record.correct_streak >= config.mastery_streak;
        prop_assert_eq!(record.is_mastered, expected);
        prop_assert_eq!(record.mistake_delta, 0);
    }

    #[test]
    fn prop_retry_never_grows_streak(mut record in arb_record()) {
        let before = record.correct_streak;
        let answer = Answer { is_correct: true, is_first_try: false };
        apply_answer(&mut record, answer, &ScoringConfig::default(), Utc::now());
        prop_assert_eq!(record.correct_streak, before);
    }

    #[test]
    fn prop_mark_mastered_is_unconditional(mut record in arb_record()) {
        let streak = record.correct_streak;
        apply_mastered(&mut record, Utc::now());
        prop_assert!(record.is_mastered);
        prop_assert_eq!(record.difficulty, 0.0);
        prop_assert_eq!(record.correct_streak, streak);
    }
}
