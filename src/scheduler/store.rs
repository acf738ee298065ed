use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{
    CatalogItem, DetailOverrides, EnrolledWord, ItemId, LearnerId, LevelProgress, MasteryRecord,
    ProgressSummary, RecordLookup, Tier, WordOrder,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Per-learner progress persistence.
///
/// `upsert_record` overwrites every mastery field but merges the mistake
/// counter: the stored total grows by `record.mistake_delta`. Implementations
/// must apply that merge atomically on their side.
///
/// Every write for an item missing from the catalog fails with a `StoreError`
/// and leaves the learner's list unchanged.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_record(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<RecordLookup, StoreError>;

    /// Writes mastery fields; leaves detail overrides as stored.
    async fn upsert_record(&self, record: &MasteryRecord) -> Result<(), StoreError>;

    /// Writes detail overrides and `last_seen_at`; leaves mastery fields as stored.
    async fn upsert_overrides(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        overrides: &DetailOverrides,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn delete_record(&self, learner_id: LearnerId, item_id: ItemId)
        -> Result<bool, StoreError>;

    async fn delete_all_records(&self, learner_id: LearnerId) -> Result<u64, StoreError>;

    async fn find_tier(
        &self,
        learner_id: LearnerId,
        tier: Tier,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError>;

    /// Unordered draw of the learner's records, skipping `exclude_ids`.
    /// Callers always pass a non-empty exclusion list.
    async fn find_random(
        &self,
        learner_id: LearnerId,
        exclude_ids: &[ItemId],
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError>;

    /// Inserts zero records for items not yet in the learner's list.
    /// Returns how many were created.
    async fn enroll(
        &self,
        learner_id: LearnerId,
        item_ids: &[ItemId],
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    async fn count_by_state(&self, learner_id: LearnerId) -> Result<ProgressSummary, StoreError>;

    /// One page of the learner's list joined with the catalog, ordered on
    /// `original`. `filter` is a case-insensitive prefix on original text or
    /// translation. Returns the page and the unpaged match count.
    async fn list_words(
        &self,
        learner_id: LearnerId,
        filter: Option<&str>,
        order: WordOrder,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<EnrolledWord>, u64), StoreError>;

    /// Record and mastered counts grouped by catalog level.
    async fn progress_by_level(&self, learner_id: LearnerId)
        -> Result<Vec<LevelProgress>, StoreError>;
}

/// Read-only dictionary access.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    /// Prefix match on original text or translation, ascending by original.
    async fn search_by_text(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, StoreError>;

    async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>, StoreError>;

    async fn get_items(
        &self,
        item_ids: &[ItemId],
    ) -> Result<HashMap<ItemId, CatalogItem>, StoreError> {
        let mut out = HashMap::with_capacity(item_ids.len());
        for id in item_ids {
            if let Some(item) = self.get_item(*id).await? {
                out.insert(*id, item);
            }
        }
        Ok(out)
    }

    async fn ids_by_level(&self, level: &str) -> Result<Vec<ItemId>, StoreError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
