use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use crate::scheduler::{
    CatalogItem, DetailOverrides, EnrolledWord, ItemCatalog, ItemId, LearnerId, LevelProgress,
    MasteryRecord, MasteryState, ProgressStore, ProgressSummary, RecordLookup, StoreError, Tier,
    WordOrder,
};

#[derive(Debug, Clone)]
struct StoredProgress {
    record: MasteryRecord,
    total_mistakes: u64,
}

impl StoredProgress {
    fn fresh(learner_id: LearnerId, item_id: ItemId, at: DateTime<Utc>) -> Self {
        Self {
            record: MasteryRecord::fresh(learner_id, item_id, at),
            total_mistakes: 0,
        }
    }

    fn state(&self) -> MasteryState {
        MasteryState::classify(
            self.record.is_mastered,
            self.record.correct_streak,
            self.total_mistakes,
        )
    }

    fn enrolled(&self, item: &CatalogItem) -> EnrolledWord {
        EnrolledWord {
            item: item.clone(),
            is_mastered: self.record.is_mastered,
            correct_streak: self.record.correct_streak,
            total_mistakes: self.total_mistakes,
            difficulty: self.record.difficulty,
            last_seen_at: self.record.last_seen_at,
            overrides: self.record.overrides.clone(),
        }
    }
}

/// Case-insensitive prefix on original text or translation; `prefix` is lowercase.
fn matches_prefix(item: &CatalogItem, prefix: &str) -> bool {
    item.original.to_lowercase().starts_with(prefix)
        || item.translation.to_lowercase().starts_with(prefix)
}

/// Case-insensitive order on original text, raw text as the tie-break.
fn compare_original(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.original
        .to_lowercase()
        .cmp(&b.original.to_lowercase())
        .then_with(|| a.original.cmp(&b.original))
}

/// Process-local catalog and progress store.
///
/// Every write runs under a single write lock, so the mistake merge is atomic.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<ItemId, CatalogItem>>,
    progress: RwLock<HashMap<(LearnerId, ItemId), StoredProgress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let store = Self::new();
        store.insert_items(items);
        store
    }

    pub fn insert_items(&self, items: impl IntoIterator<Item = CatalogItem>) {
        let mut guard = self.items.write();
        for item in items {
            guard.insert(item.id, item);
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Cumulative mistakes for a pair; not part of the store contract.
    pub fn total_mistakes(&self, learner_id: LearnerId, item_id: ItemId) -> Option<u64> {
        self.progress
            .read()
            .get(&(learner_id, item_id))
            .map(|stored| stored.total_mistakes)
    }

    fn ensure_cataloged(&self, item_ids: &[ItemId]) -> Result<(), StoreError> {
        let items = self.items.read();
        match item_ids.iter().find(|id| !items.contains_key(id)) {
            Some(missing) => Err(StoreError::Backend(format!(
                "word {missing} is not in the dictionary"
            ))),
            None => Ok(()),
        }
    }

    fn learner_rows<F>(&self, learner_id: LearnerId, mut keep: F) -> Vec<MasteryRecord>
    where
        F: FnMut(&StoredProgress) -> bool,
    {
        self.progress
            .read()
            .values()
            .filter(|stored| stored.record.learner_id == learner_id && keep(stored))
            .map(|stored| stored.record.clone())
            .collect()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_record(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<RecordLookup, StoreError> {
        Ok(match self.progress.read().get(&(learner_id, item_id)) {
            Some(stored) => RecordLookup::Existing(stored.record.clone()),
            None => RecordLookup::NotYetCreated,
        })
    }

    async fn upsert_record(&self, record: &MasteryRecord) -> Result<(), StoreError> {
        self.ensure_cataloged(&[record.item_id])?;
        let mut guard = self.progress.write();
        let stored = guard
            .entry((record.learner_id, record.item_id))
            .or_insert_with(|| {
                StoredProgress::fresh(record.learner_id, record.item_id, record.last_seen_at)
            });

        stored.total_mistakes = stored
            .total_mistakes
            .saturating_add(u64::from(record.mistake_delta));
        stored.record.is_mastered = record.is_mastered;
        stored.record.correct_streak = record.correct_streak;
        stored.record.difficulty = record.difficulty;
        stored.record.last_seen_at = record.last_seen_at;
        Ok(())
    }

    async fn upsert_overrides(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        overrides: &DetailOverrides,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.ensure_cataloged(&[item_id])?;
        let mut guard = self.progress.write();
        let stored = guard
            .entry((learner_id, item_id))
            .or_insert_with(|| StoredProgress::fresh(learner_id, item_id, at));
        stored.record.overrides = overrides.clone();
        stored.record.last_seen_at = at;
        Ok(())
    }

    async fn delete_record(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<bool, StoreError> {
        Ok(self.progress.write().remove(&(learner_id, item_id)).is_some())
    }

    async fn delete_all_records(&self, learner_id: LearnerId) -> Result<u64, StoreError> {
        let mut guard = self.progress.write();
        let before = guard.len();
        guard.retain(|(learner, _), _| *learner != learner_id);
        Ok((before - guard.len()) as u64)
    }

    async fn find_tier(
        &self,
        learner_id: LearnerId,
        tier: Tier,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        let mut rows = self.learner_rows(learner_id, |stored| {
            tier.matches(&stored.record, stored.total_mistakes)
        });
        rows.sort_by(|a, b| tier.compare(a, b));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn find_random(
        &self,
        learner_id: LearnerId,
        exclude_ids: &[ItemId],
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        let mut rows = self.learner_rows(learner_id, |stored| {
            !exclude_ids.contains(&stored.record.item_id)
        });
        rows.shuffle(&mut rand::rng());
        rows.truncate(limit);
        Ok(rows)
    }

    async fn enroll(
        &self,
        learner_id: LearnerId,
        item_ids: &[ItemId],
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.ensure_cataloged(item_ids)?;
        let mut guard = self.progress.write();
        let mut created = 0;
        for item_id in item_ids {
            if let Entry::Vacant(slot) = guard.entry((learner_id, *item_id)) {
                slot.insert(StoredProgress::fresh(learner_id, *item_id, at));
                created += 1;
            }
        }
        Ok(created)
    }

    async fn count_by_state(&self, learner_id: LearnerId) -> Result<ProgressSummary, StoreError> {
        let (mut unseen, mut struggling, mut mastered) = (0, 0, 0);
        for stored in self
            .progress
            .read()
            .values()
            .filter(|stored| stored.record.learner_id == learner_id)
        {
            match stored.state() {
                MasteryState::Unseen => unseen += 1,
                MasteryState::Struggling => struggling += 1,
                MasteryState::Mastered => mastered += 1,
            }
        }
        Ok(ProgressSummary::from_counts(unseen, struggling, mastered))
    }

    async fn list_words(
        &self,
        learner_id: LearnerId,
        filter: Option<&str>,
        order: WordOrder,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<EnrolledWord>, u64), StoreError> {
        let prefix = filter.map(str::to_lowercase);
        let items = self.items.read();
        let mut rows: Vec<EnrolledWord> = self
            .progress
            .read()
            .values()
            .filter(|stored| stored.record.learner_id == learner_id)
            .filter_map(|stored| {
                let item = items.get(&stored.record.item_id)?;
                match prefix.as_deref() {
                    Some(prefix) if !matches_prefix(item, prefix) => None,
                    _ => Some(stored.enrolled(item)),
                }
            })
            .collect();

        rows.sort_by(|a, b| compare_original(&a.item, &b.item));
        if order == WordOrder::Desc {
            rows.reverse();
        }
        let total = rows.len() as u64;
        Ok((rows.into_iter().skip(offset).take(limit).collect(), total))
    }

    async fn progress_by_level(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LevelProgress>, StoreError> {
        let items = self.items.read();
        let mut levels: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for stored in self
            .progress
            .read()
            .values()
            .filter(|stored| stored.record.learner_id == learner_id)
        {
            let Some(item) = items.get(&stored.record.item_id) else {
                continue;
            };
            let entry = levels.entry(item.level.clone()).or_default();
            entry.0 += 1;
            if stored.record.is_mastered {
                entry.1 += 1;
            }
        }
        Ok(levels
            .into_iter()
            .map(|(level, (total, mastered))| LevelProgress {
                level,
                total,
                mastered,
            })
            .collect())
    }
}

#[async_trait]
impl ItemCatalog for MemoryStore {
    async fn search_by_text(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, StoreError> {
        let prefix = prefix.to_lowercase();
        let mut hits: Vec<CatalogItem> = self
            .items
            .read()
            .values()
            .filter(|item| matches_prefix(item, &prefix))
            .cloned()
            .collect();
        hits.sort_by(compare_original);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>, StoreError> {
        Ok(self.items.read().get(&item_id).cloned())
    }

    async fn get_items(
        &self,
        item_ids: &[ItemId],
    ) -> Result<HashMap<ItemId, CatalogItem>, StoreError> {
        let guard = self.items.read();
        Ok(item_ids
            .iter()
            .filter_map(|id| guard.get(id).map(|item| (*id, item.clone())))
            .collect())
    }

    async fn ids_by_level(&self, level: &str) -> Result<Vec<ItemId>, StoreError> {
        let guard = self.items.read();
        let mut items: Vec<&CatalogItem> =
            guard.values().filter(|item| item.level == level).collect();
        items.sort_by(|a, b| compare_original(a, b));
        Ok(items.into_iter().map(|item| item.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(original: &str, translation: &str, level: &str) -> CatalogItem {
        CatalogItem {
            id: Uuid::new_v4(),
            original: original.to_string(),
            translation: translation.to_string(),
            transcription: String::new(),
            pos: String::new(),
            level: level.to_string(),
            past_simple_singular: String::new(),
            past_simple_plural: String::new(),
            past_participle_singular: String::new(),
            past_participle_plural: String::new(),
            synonyms: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_accumulates_mistakes_and_keeps_overrides() {
        let word = item("walk", "гулять", "A1");
        let (learner, word_id) = (Uuid::new_v4(), word.id);
        let store = MemoryStore::with_items([word]);
        let now = Utc::now();

        let overrides = DetailOverrides {
            translation: Some("custom".to_string()),
            ..DetailOverrides::default()
        };
        store.upsert_overrides(learner, word_id, &overrides, now).await.unwrap();

        let mut record = MasteryRecord::fresh(learner, word_id, now);
        record.mistake_delta = 1;
        store.upsert_record(&record).await.unwrap();
        store.upsert_record(&record).await.unwrap();
        record.mistake_delta = 0;
        store.upsert_record(&record).await.unwrap();

        assert_eq!(store.total_mistakes(learner, word_id), Some(2));
        let RecordLookup::Existing(stored) = store.get_record(learner, word_id).await.unwrap()
        else {
            panic!("record should exist");
        };
        assert_eq!(stored.overrides, overrides);
        assert_eq!(stored.mistake_delta, 0);
    }

    #[tokio::test]
    async fn test_writes_for_uncataloged_item_fail() {
        let known = item("walk", "гулять", "A1");
        let known_id = known.id;
        let store = MemoryStore::with_items([known]);
        let (learner, stray) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();

        let record = MasteryRecord::fresh(learner, stray, now);
        assert!(matches!(
            store.upsert_record(&record).await,
            Err(StoreError::Backend(_))
        ));
        assert!(store
            .upsert_overrides(learner, stray, &DetailOverrides::default(), now)
            .await
            .is_err());
        assert!(store.enroll(learner, &[known_id, stray], now).await.is_err());

        assert_eq!(store.count_by_state(learner).await.unwrap().total, 0);
        assert_eq!(store.get_record(learner, stray).await.unwrap(), RecordLookup::NotYetCreated);
    }

    #[tokio::test]
    async fn test_enroll_is_insert_if_absent() {
        let catalog = [item("a", "", "A1"), item("b", "", "A1")];
        let ids = [catalog[0].id, catalog[1].id];
        let store = MemoryStore::with_items(catalog);
        let learner = Uuid::new_v4();

        assert_eq!(store.enroll(learner, &ids, Utc::now()).await.unwrap(), 2);
        assert_eq!(store.enroll(learner, &ids, Utc::now()).await.unwrap(), 0);
        assert_eq!(store.count_by_state(learner).await.unwrap().unseen, 2);
    }

    #[tokio::test]
    async fn test_search_prefix_case_insensitive_sorted() {
        let store = MemoryStore::with_items([
            item("Run", "бежать", "A1"),
            item("rain", "дождь", "A1"),
            item("run", "пробег", "A1"),
            item("go", "идти", "A2"),
        ]);

        let hits = store.search_by_text("r", 20).await.unwrap();
        let originals: Vec<&str> = hits.iter().map(|i| i.original.as_str()).collect();
        assert_eq!(originals, vec!["rain", "Run", "run"]);

        let by_translation = store.search_by_text("ИД", 20).await.unwrap();
        assert_eq!(by_translation.len(), 1);
        assert_eq!(by_translation[0].original, "go");

        assert_eq!(store.ids_by_level("A1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_words_filters_orders_and_pages() {
        let catalog = [
            item("Bread", "хлеб", "A1"),
            item("apple", "яблоко", "A1"),
            item("brick", "кирпич", "B1"),
            item("cat", "кошка", "A1"),
        ];
        let ids: Vec<ItemId> = catalog.iter().map(|i| i.id).collect();
        let store = MemoryStore::with_items(catalog);
        let (learner, other) = (Uuid::new_v4(), Uuid::new_v4());
        store.enroll(learner, &ids[..3], Utc::now()).await.unwrap();
        store.enroll(other, &ids, Utc::now()).await.unwrap();

        let (page, total) = store
            .list_words(learner, None, WordOrder::Asc, 2, 0)
            .await
            .unwrap();
        let originals: Vec<&str> = page.iter().map(|w| w.item.original.as_str()).collect();
        assert_eq!(total, 3);
        assert_eq!(originals, vec!["apple", "Bread"]);

        let (page, _) = store
            .list_words(learner, None, WordOrder::Desc, 2, 2)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].item.original, "apple");

        let (page, total) = store
            .list_words(learner, Some("b"), WordOrder::Asc, 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].item.original, "Bread");

        let (_, total) = store
            .list_words(learner, Some("кир"), WordOrder::Asc, 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_progress_by_level_counts_mastered() {
        let catalog = [item("a", "", "A1"), item("b", "", "A1"), item("c", "", "")];
        let ids: Vec<ItemId> = catalog.iter().map(|i| i.id).collect();
        let store = MemoryStore::with_items(catalog);
        let learner = Uuid::new_v4();
        store.enroll(learner, &ids, Utc::now()).await.unwrap();

        let mut mastered = MasteryRecord::fresh(learner, ids[0], Utc::now());
        mastered.is_mastered = true;
        store.upsert_record(&mastered).await.unwrap();

        let levels = store.progress_by_level(learner).await.unwrap();
        assert_eq!(
            levels,
            vec![
                LevelProgress { level: String::new(), total: 1, mastered: 0 },
                LevelProgress { level: "A1".to_string(), total: 2, mastered: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_all_only_touches_one_learner() {
        let catalog = [item("a", "", "A1"), item("b", "", "A1")];
        let ids = [catalog[0].id, catalog[1].id];
        let store = MemoryStore::with_items(catalog);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.enroll(a, &ids, Utc::now()).await.unwrap();
        store.enroll(b, &ids, Utc::now()).await.unwrap();

        assert_eq!(store.delete_all_records(a).await.unwrap(), 2);
        assert_eq!(store.count_by_state(a).await.unwrap().total, 0);
        assert_eq!(store.count_by_state(b).await.unwrap().total, 2);
    }
}
