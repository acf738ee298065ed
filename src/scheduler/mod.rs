pub mod composer;
pub mod config;
pub mod projector;
pub mod resolver;
pub mod scorer;
pub mod store;
pub mod types;

use std::sync::Arc;

use tracing::instrument;

pub use composer::LessonComposer;
pub use config::{LessonConfig, SchedulerConfig, ScoringConfig};
pub use resolver::WordResolver;
pub use store::{Clock, ItemCatalog, ProgressStore, StoreError, SystemClock};
pub use types::*;

use resolver::SEARCH_LIMIT;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Entry point for lesson composition and answer scoring.
///
/// Holds no state between calls besides its collaborators. Every operation
/// runs inside a child of the span passed at construction.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn ProgressStore>,
    catalog: Arc<dyn ItemCatalog>,
    resolver: WordResolver,
    composer: LessonComposer,
    scoring: ScoringConfig,
    clock: Arc<dyn Clock>,
    span: tracing::Span,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        catalog: Arc<dyn ItemCatalog>,
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        span: tracing::Span,
    ) -> Self {
        Self {
            resolver: WordResolver::new(Arc::clone(&catalog)),
            composer: LessonComposer::new(Arc::clone(&store), Arc::clone(&catalog), config.lesson),
            store,
            catalog,
            scoring: config.scoring,
            clock,
            span,
        }
    }

    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn compose(&self, learner_id: LearnerId) -> Result<LessonBatch, SchedulerError> {
        let batch = self.composer.compose(learner_id).await?;
        tracing::debug!(size = batch.len(), "lesson composed");
        Ok(batch)
    }

    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn score(
        &self,
        learner_id: LearnerId,
        identifier: &str,
        answer: Answer,
    ) -> Result<UpdatedMastery, SchedulerError> {
        let item_id = self.resolver.resolve(identifier).await?;
        let now = self.clock.now();
        let mut record = self
            .store
            .get_record(learner_id, item_id)
            .await?
            .into_record_or_fresh(learner_id, item_id, now);

        scorer::apply_answer(&mut record, answer, &self.scoring, now);
        tracing::debug!(
            item_id = %item_id,
            is_correct = answer.is_correct,
            is_first_try = answer.is_first_try,
            difficulty = record.difficulty,
            streak = record.correct_streak,
            mastered = record.is_mastered,
            "answer scored"
        );

        self.store.upsert_record(&record).await?;
        Ok(UpdatedMastery::from(&record))
    }

    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn mark_as_mastered(
        &self,
        learner_id: LearnerId,
        identifier: &str,
    ) -> Result<UpdatedMastery, SchedulerError> {
        let item_id = self.resolver.resolve(identifier).await?;
        let now = self.clock.now();
        let mut record = self
            .store
            .get_record(learner_id, item_id)
            .await?
            .into_record_or_fresh(learner_id, item_id, now);

        scorer::apply_mastered(&mut record, now);
        self.store.upsert_record(&record).await?;
        tracing::info!(item_id = %item_id, "word marked as mastered");
        Ok(UpdatedMastery::from(&record))
    }

    /// Replaces the learner's overrides for one word. `None` clears a field.
    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn edit_details(
        &self,
        learner_id: LearnerId,
        identifier: &str,
        overrides: DetailOverrides,
    ) -> Result<ItemId, SchedulerError> {
        let item_id = self.resolver.resolve(identifier).await?;
        let overrides = DetailOverrides {
            translation: normalize_override(overrides.translation),
            transcription: normalize_override(overrides.transcription),
            synonyms: normalize_override(overrides.synonyms),
        };
        self.store
            .upsert_overrides(learner_id, item_id, &overrides, self.clock.now())
            .await?;
        tracing::debug!(item_id = %item_id, "word details updated");
        Ok(item_id)
    }

    /// Adds a word to the learner's list. Returns false when already present.
    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn enroll(
        &self,
        learner_id: LearnerId,
        identifier: &str,
    ) -> Result<bool, SchedulerError> {
        let item_id = self.resolver.resolve(identifier).await?;
        let created = self
            .store
            .enroll(learner_id, &[item_id], self.clock.now())
            .await?;
        Ok(created > 0)
    }

    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn enroll_level(
        &self,
        learner_id: LearnerId,
        level: &str,
    ) -> Result<u64, SchedulerError> {
        let level = level.trim();
        if level.is_empty() {
            return Err(SchedulerError::Validation("level must not be empty".to_string()));
        }
        let ids = self.catalog.ids_by_level(level).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        let created = self.store.enroll(learner_id, &ids, self.clock.now()).await?;
        tracing::info!(level, created, "words enrolled by level");
        Ok(created)
    }

    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn remove(&self, learner_id: LearnerId, identifier: &str) -> Result<(), SchedulerError> {
        let item_id = self.resolver.resolve(identifier).await?;
        if !self.store.delete_record(learner_id, item_id).await? {
            return Err(SchedulerError::NotFound(format!(
                "word {item_id} is not in the learner's list"
            )));
        }
        Ok(())
    }

    #[instrument(parent = &self.span, level = "debug", skip_all, fields(learner_id = %learner_id))]
    pub async fn reset(&self, learner_id: LearnerId) -> Result<u64, SchedulerError> {
        let removed = self.store.delete_all_records(learner_id).await?;
        tracing::info!(removed, "learner progress reset");
        Ok(removed)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, SchedulerError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SchedulerError::Validation("search query must not be empty".to_string()));
        }
        Ok(self.catalog.search_by_text(query, SEARCH_LIMIT).await?)
    }

    /// State counts plus the mastered percentage per catalog level.
    pub async fn summary(&self, learner_id: LearnerId) -> Result<ProgressSummary, SchedulerError> {
        let summary = self.store.count_by_state(learner_id).await?;
        let levels = self.store.progress_by_level(learner_id).await?;
        Ok(summary.with_levels(&levels))
    }

    /// One page of the learner's list. Page 0 reads as 1, limit 0 as the
    /// default, and the limit is capped at `MAX_PAGE_SIZE`.
    pub async fn list_words(
        &self,
        learner_id: LearnerId,
        query: WordListQuery,
    ) -> Result<WordPage, SchedulerError> {
        let limit = match query.limit {
            0 => DEFAULT_PAGE_SIZE,
            limit => limit.min(MAX_PAGE_SIZE),
        };
        let page = query.page.max(1);
        let offset = (page - 1).saturating_mul(limit);
        let filter = query
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());

        let (words, total) = self
            .store
            .list_words(
                learner_id,
                filter,
                query.order,
                usize::try_from(limit).unwrap_or(usize::MAX),
                usize::try_from(offset).unwrap_or(usize::MAX),
            )
            .await?;

        Ok(WordPage {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
            words,
        })
    }
}

fn normalize_override(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
