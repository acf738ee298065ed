use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::config::LessonConfig;
use super::projector::project;
use super::store::{ItemCatalog, ProgressStore};
use super::types::{ItemId, LearnerId, LessonBatch, MasteryRecord, Tier};
use super::SchedulerError;

/// Stand-in exclusion id for an empty base selection. No catalog row uses it.
pub const EMPTY_EXCLUSION_SENTINEL: Uuid = Uuid::nil();

/// Builds lesson batches: New, Struggling, Review tiers in that order, then a
/// random backfill from the rest of the learner's list.
#[derive(Clone)]
pub struct LessonComposer {
    store: Arc<dyn ProgressStore>,
    catalog: Arc<dyn ItemCatalog>,
    config: LessonConfig,
}

impl LessonComposer {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        catalog: Arc<dyn ItemCatalog>,
        config: LessonConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub async fn compose(&self, learner_id: LearnerId) -> Result<LessonBatch, SchedulerError> {
        let records = self.select_records(learner_id).await?;
        if records.is_empty() {
            return Ok(LessonBatch::default());
        }

        let ids: Vec<ItemId> = records.iter().map(|r| r.item_id).collect();
        let items = self.catalog.get_items(&ids).await?;

        let mut words = Vec::with_capacity(records.len());
        for record in &records {
            let Some(item) = items.get(&record.item_id) else {
                return Err(SchedulerError::NotFound(format!(
                    "catalog item {} not found",
                    record.item_id
                )));
            };
            words.push(project(record, item));
        }

        Ok(LessonBatch { words })
    }

    /// Tiered base selection plus backfill, before projection.
    pub async fn select_records(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<MasteryRecord>, SchedulerError> {
        let target = self.config.batch_size;
        let mut selected: Vec<MasteryRecord> = Vec::with_capacity(target);

        for tier in Tier::ORDERED {
            let remaining = target.saturating_sub(selected.len());
            let limit = self.config.cap(tier).min(remaining);
            if limit == 0 {
                continue;
            }
            let mut rows = self.store.find_tier(learner_id, tier, limit).await?;
            rows.truncate(limit);
            tracing::debug!(tier = tier.as_str(), count = rows.len(), "lesson tier selected");
            selected.extend(rows);
        }

        let needed = target.saturating_sub(selected.len());
        if needed == 0 {
            return Ok(selected);
        }

        let mut seen: HashSet<ItemId> = selected.iter().map(|r| r.item_id).collect();
        let mut exclude: Vec<ItemId> = selected.iter().map(|r| r.item_id).collect();
        if exclude.is_empty() {
            exclude.push(EMPTY_EXCLUSION_SENTINEL);
        }

        let backfill = self
            .store
            .find_random(learner_id, &exclude, needed)
            .await?;
        let before = selected.len();
        for record in backfill {
            if selected.len() >= target {
                break;
            }
            if seen.insert(record.item_id) {
                selected.push(record);
            }
        }
        tracing::debug!(count = selected.len() - before, "lesson backfill selected");

        Ok(selected)
    }
}
