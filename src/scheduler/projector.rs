use super::types::{CatalogItem, LearnerWord, MasteryRecord};

/// Learner override when present and non-empty, otherwise the canonical value.
pub fn override_or(custom: Option<&str>, canonical: &str) -> String {
    match custom {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => canonical.to_string(),
    }
}

pub fn project(record: &MasteryRecord, item: &CatalogItem) -> LearnerWord {
    let overrides = &record.overrides;
    LearnerWord {
        id: item.id,
        original: item.original.clone(),
        translation: override_or(overrides.translation.as_deref(), &item.translation),
        transcription: override_or(overrides.transcription.as_deref(), &item.transcription),
        pos: item.pos.clone(),
        level: item.level.clone(),
        past_simple_singular: item.past_simple_singular.clone(),
        past_simple_plural: item.past_simple_plural.clone(),
        past_participle_singular: item.past_participle_singular.clone(),
        past_participle_plural: item.past_participle_plural.clone(),
        synonyms: override_or(overrides.synonyms.as_deref(), &item.synonyms),
        difficulty: record.difficulty,
        is_mastered: record.is_mastered,
        correct_streak: record.correct_streak,
    }
}
