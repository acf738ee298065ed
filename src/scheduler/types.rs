use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LearnerId = Uuid;
pub type ItemId = Uuid;

/// Canonical dictionary entry. Only the import pipeline writes these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub original: String,
    pub translation: String,
    pub transcription: String,
    pub pos: String,
    pub level: String,
    pub past_simple_singular: String,
    pub past_simple_plural: String,
    pub past_participle_singular: String,
    pub past_participle_plural: String,
    pub synonyms: String,
}

/// Learner-specific replacements for catalog content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailOverrides {
    pub translation: Option<String>,
    pub transcription: Option<String>,
    pub synonyms: Option<String>,
}

/// Per-(learner, item) learning progress.
///
/// `mistake_delta` is the increment a write adds to the stored mistake total.
/// Records read back from a store always carry `0` here; the cumulative total
/// only shows up in the word listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    pub is_mastered: bool,
    pub correct_streak: u32,
    pub mistake_delta: u32,
    pub difficulty: f64,
    pub last_seen_at: DateTime<Utc>,
    pub overrides: DetailOverrides,
}

impl MasteryRecord {
    /// Zero-valued record, as created when an item enters the learner's list.
    pub fn fresh(learner_id: LearnerId, item_id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            item_id,
            is_mastered: false,
            correct_streak: 0,
            mistake_delta: 0,
            difficulty: 0.0,
            last_seen_at: now,
            overrides: DetailOverrides::default(),
        }
    }
}

/// Outcome of a progress lookup. Absence is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLookup {
    Existing(MasteryRecord),
    NotYetCreated,
}

impl RecordLookup {
    pub fn into_record_or_fresh(
        self,
        learner_id: LearnerId,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> MasteryRecord {
        match self {
            RecordLookup::Existing(record) => record,
            RecordLookup::NotYetCreated => MasteryRecord::fresh(learner_id, item_id, now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MasteryState {
    Unseen,
    Struggling,
    Mastered,
}

impl MasteryState {
    pub fn classify(is_mastered: bool, correct_streak: u32, total_mistakes: u64) -> Self {
        if is_mastered {
            MasteryState::Mastered
        } else if total_mistakes == 0 && correct_streak == 0 {
            MasteryState::Unseen
        } else {
            MasteryState::Struggling
        }
    }
}

/// Priority class used to compose a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Never attempted; oldest-added first.
    New,
    /// Attempted but not mastered; hardest first, then oldest.
    Struggling,
    /// Mastered; longest-unreviewed first.
    Review,
}

impl Tier {
    pub const ORDERED: [Tier; 3] = [Tier::New, Tier::Struggling, Tier::Review];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::New => "new",
            Tier::Struggling => "struggling",
            Tier::Review => "review",
        }
    }

    pub fn state(self) -> MasteryState {
        match self {
            Tier::New => MasteryState::Unseen,
            Tier::Struggling => MasteryState::Struggling,
            Tier::Review => MasteryState::Mastered,
        }
    }

    /// Tier membership given the store-side mistake total.
    pub fn matches(self, record: &MasteryRecord, total_mistakes: u64) -> bool {
        MasteryState::classify(record.is_mastered, record.correct_streak, total_mistakes)
            == self.state()
    }

    /// Selection order inside the tier.
    pub fn compare(self, a: &MasteryRecord, b: &MasteryRecord) -> Ordering {
        match self {
            Tier::New | Tier::Review => a.last_seen_at.cmp(&b.last_seen_at),
            Tier::Struggling => b
                .difficulty
                .total_cmp(&a.difficulty)
                .then_with(|| a.last_seen_at.cmp(&b.last_seen_at)),
        }
    }
}

/// Learner-facing view of an item with overrides applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerWord {
    pub id: ItemId,
    pub original: String,
    pub translation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transcription: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pos: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub level: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub past_simple_singular: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub past_simple_plural: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub past_participle_singular: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub past_participle_plural: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub synonyms: String,
    pub difficulty: f64,
    pub is_mastered: bool,
    pub correct_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonBatch {
    pub words: Vec<LearnerWord>,
}

impl LessonBatch {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.words.iter().map(|w| w.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub is_correct: bool,
    pub is_first_try: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedMastery {
    pub item_id: ItemId,
    pub difficulty: f64,
    pub is_mastered: bool,
    pub correct_streak: u32,
}

impl From<&MasteryRecord> for UpdatedMastery {
    fn from(record: &MasteryRecord) -> Self {
        Self {
            item_id: record.item_id,
            difficulty: record.difficulty,
            is_mastered: record.is_mastered,
            correct_streak: record.correct_streak,
        }
    }
}

/// Sort direction of the word listing, on the item's original text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WordOrder {
    Asc,
    #[default]
    Desc,
}

impl WordOrder {
    /// `asc` in any case sorts ascending; anything else descending.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            WordOrder::Asc
        } else {
            WordOrder::Desc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            WordOrder::Asc => "ASC",
            WordOrder::Desc => "DESC",
        }
    }
}

/// Paging and filtering for the learner's word list. Zero page or limit
/// means the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordListQuery {
    pub filter: Option<String>,
    pub order: WordOrder,
    pub page: u64,
    pub limit: u64,
}

/// One entry of the learner's list: catalog content, raw progress and the
/// overrides as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledWord {
    #[serde(flatten)]
    pub item: CatalogItem,
    pub is_mastered: bool,
    pub correct_streak: u32,
    pub total_mistakes: u64,
    pub difficulty: f64,
    pub last_seen_at: DateTime<Utc>,
    pub overrides: DetailOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPage {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
    pub words: Vec<EnrolledWord>,
}

/// Record counts for one catalog level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: String,
    pub total: u64,
    pub mastered: u64,
}

/// Bucket name for items without a level.
pub const UNLEVELED: &str = "Other";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total: u64,
    pub unseen: u64,
    pub struggling: u64,
    pub mastered: u64,
    pub mastered_percent: f64,
    pub by_level: BTreeMap<String, f64>,
}

impl ProgressSummary {
    pub fn from_counts(unseen: u64, struggling: u64, mastered: u64) -> Self {
        let total = unseen + struggling + mastered;
        Self {
            total,
            unseen,
            struggling,
            mastered,
            mastered_percent: percent(mastered, total),
            by_level: BTreeMap::new(),
        }
    }

    /// Adds the mastered percentage per level. Blank levels go to `Other`.
    pub fn with_levels(mut self, levels: &[LevelProgress]) -> Self {
        let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for level in levels {
            let name = match level.level.trim() {
                "" => UNLEVELED,
                name => name,
            };
            let entry = counts.entry(name.to_string()).or_default();
            entry.0 += level.total;
            entry.1 += level.mastered;
        }
        self.by_level = counts
            .into_iter()
            .map(|(name, (total, mastered))| (name, percent(mastered, total)))
            .collect();
        self
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(difficulty: f64, offset_secs: i64) -> MasteryRecord {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut r = MasteryRecord::fresh(Uuid::new_v4(), Uuid::new_v4(), base);
        r.difficulty = difficulty;
        r.last_seen_at = base + Duration::seconds(offset_secs);
        r
    }

    #[test]
    fn test_tier_membership() {
        let mut r = record(0.0, 0);
        assert!(Tier::New.matches(&r, 0));
        assert!(Tier::Struggling.matches(&r, 1));

        r.correct_streak = 1;
        assert!(Tier::Struggling.matches(&r, 0));
        assert!(!Tier::New.matches(&r, 0));

        r.is_mastered = true;
        assert!(Tier::Review.matches(&r, 3));
        assert!(!Tier::Struggling.matches(&r, 3));
    }

    #[test]
    fn test_struggling_order_hardest_then_oldest() {
        let hard = record(0.9, 50);
        let easy_old = record(0.3, 0);
        let easy_new = record(0.3, 10);

        let mut rows = vec![easy_new.clone(), hard.clone(), easy_old.clone()];
        rows.sort_by(|a, b| Tier::Struggling.compare(a, b));

        assert_eq!(rows, vec![hard, easy_old, easy_new]);
    }

    #[test]
    fn test_summary_by_level_merges_blank_levels() {
        let summary = ProgressSummary::from_counts(2, 0, 2).with_levels(&[
            LevelProgress { level: "A1".to_string(), total: 2, mastered: 1 },
            LevelProgress { level: String::new(), total: 1, mastered: 1 },
            LevelProgress { level: " ".to_string(), total: 1, mastered: 0 },
        ]);
        assert_eq!(summary.by_level.len(), 2);
        assert!((summary.by_level["A1"] - 50.0).abs() < 1e-9);
        assert!((summary.by_level[UNLEVELED] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_word_order_parse() {
        assert_eq!(WordOrder::parse("ASC"), WordOrder::Asc);
        assert_eq!(WordOrder::parse("asc"), WordOrder::Asc);
        assert_eq!(WordOrder::parse("up"), WordOrder::Desc);
        assert_eq!(WordOrder::default().as_sql(), "DESC");
    }

    #[test]
    fn test_summary_percent() {
        assert_eq!(ProgressSummary::from_counts(0, 0, 0).mastered_percent, 0.0);
        let summary = ProgressSummary::from_counts(1, 1, 2);
        assert_eq!(summary.total, 4);
        assert!((summary.mastered_percent - 50.0).abs() < 1e-9);
    }
}
