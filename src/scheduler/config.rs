use serde::{Deserialize, Serialize};

use super::types::Tier;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_NEW_CAP: usize = 2;
const DEFAULT_STRUGGLING_CAP: usize = 5;
const DEFAULT_REVIEW_CAP: usize = 3;

const DEFAULT_IMPROVEMENT_STEP: f64 = 0.2;
const DEFAULT_PENALTY_STEP: f64 = 0.3;
const DEFAULT_RETRY_WEIGHT: f64 = 0.5;
const DEFAULT_MASTERY_DIFFICULTY: f64 = 0.1;
const DEFAULT_MASTERY_STREAK: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub lesson: LessonConfig,
    pub scoring: ScoringConfig,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            lesson: LessonConfig::from_env(),
            scoring: ScoringConfig::from_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonConfig {
    pub batch_size: usize,
    pub new_cap: usize,
    pub struggling_cap: usize,
    pub review_cap: usize,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            new_cap: DEFAULT_NEW_CAP,
            struggling_cap: DEFAULT_STRUGGLING_CAP,
            review_cap: DEFAULT_REVIEW_CAP,
        }
    }
}

impl LessonConfig {
    fn from_env() -> Self {
        Self {
            batch_size: env_usize("LESSON_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            new_cap: env_usize("LESSON_NEW_CAP", DEFAULT_NEW_CAP),
            struggling_cap: env_usize("LESSON_STRUGGLING_CAP", DEFAULT_STRUGGLING_CAP),
            review_cap: env_usize("LESSON_REVIEW_CAP", DEFAULT_REVIEW_CAP),
        }
    }

    pub fn cap(&self, tier: Tier) -> usize {
        match tier {
            Tier::New => self.new_cap,
            Tier::Struggling => self.struggling_cap,
            Tier::Review => self.review_cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub improvement_step: f64,
    pub penalty_step: f64,
    /// Weight of a corrected retry; a first try always weighs 1.0.
    pub retry_weight: f64,
    pub mastery_difficulty: f64,
    pub mastery_streak: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            improvement_step: DEFAULT_IMPROVEMENT_STEP,
            penalty_step: DEFAULT_PENALTY_STEP,
            retry_weight: DEFAULT_RETRY_WEIGHT,
            mastery_difficulty: DEFAULT_MASTERY_DIFFICULTY,
            mastery_streak: DEFAULT_MASTERY_STREAK,
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Self {
        Self {
            improvement_step: env_unit_f64("SCORING_IMPROVEMENT_STEP", DEFAULT_IMPROVEMENT_STEP),
            penalty_step: env_unit_f64("SCORING_PENALTY_STEP", DEFAULT_PENALTY_STEP),
            retry_weight: env_unit_f64("SCORING_RETRY_WEIGHT", DEFAULT_RETRY_WEIGHT),
            mastery_difficulty: env_unit_f64(
                "MASTERY_DIFFICULTY_THRESHOLD",
                DEFAULT_MASTERY_DIFFICULTY,
            ),
            mastery_streak: env_u32("MASTERY_STREAK_THRESHOLD", DEFAULT_MASTERY_STREAK),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

/// Accepts finite values in [0, 1] only.
fn env_unit_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && (0.0..=1.0).contains(value))
        .unwrap_or(default)
}
