#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use words_backend::db::memory::MemoryStore;
use words_backend::scheduler::{
    CatalogItem, Clock, ItemCatalog, ItemId, LearnerId, MasteryRecord, ProgressStore,
    Scheduler, SchedulerConfig,
};
use words_backend::state::AppState;

pub const LEARNER_HEADER: &str = "x-learner-id";

pub fn item(original: &str, translation: &str, level: &str) -> CatalogItem {
    CatalogItem {
        id: Uuid::new_v4(),
        original: original.to_string(),
        translation: translation.to_string(),
        transcription: String::new(),
        pos: "noun".to_string(),
        level: level.to_string(),
        past_simple_singular: String::new(),
        past_simple_plural: String::new(),
        past_participle_singular: String::new(),
        past_participle_plural: String::new(),
        synonyms: String::new(),
    }
}

/// `count` items named `<prefix>-00`, `<prefix>-01`, ... at the given level.
pub fn items(prefix: &str, level: &str, count: usize) -> Vec<CatalogItem> {
    (0..count)
        .map(|i| item(&format!("{prefix}-{i:02}"), &format!("{prefix}-tr-{i:02}"), level))
        .collect()
}

pub fn base_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub scheduler: Scheduler,
}

pub fn harness(catalog: Vec<CatalogItem>) -> Harness {
    let store = Arc::new(MemoryStore::with_items(catalog));
    let clock = Arc::new(FixedClock::new(base_time()));
    let scheduler = Scheduler::new(
        Arc::clone(&store) as Arc<dyn ProgressStore>,
        Arc::clone(&store) as Arc<dyn ItemCatalog>,
        SchedulerConfig::default(),
        Arc::clone(&clock) as Arc<dyn Clock>,
        tracing::info_span!("scheduler-test"),
    );
    Harness {
        store,
        clock,
        scheduler,
    }
}

/// Harness whose catalog holds a single word; returns its id.
pub fn harness_with_word() -> (Harness, ItemId) {
    let word = item("word", "слово", "A1");
    let id = word.id;
    (harness(vec![word]), id)
}

/// Zero record last seen `offset_secs` after `base_time()`.
pub fn record_at(learner_id: LearnerId, item_id: ItemId, offset_secs: i64) -> MasteryRecord {
    MasteryRecord::fresh(learner_id, item_id, base_time() + Duration::seconds(offset_secs))
}

/// Writes the record as-is; its `mistake_delta` is added to the stored total.
pub async fn seed(store: &MemoryStore, record: MasteryRecord) {
    store.upsert_record(&record).await.unwrap();
}

pub fn create_test_app(catalog: Vec<CatalogItem>) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_items(catalog));
    let state = AppState::with_memory(Arc::clone(&store), SchedulerConfig::default());
    (words_backend::build_router(state), store)
}

pub fn request(method: &str, uri: &str, learner: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(learner) = learner {
        builder = builder.header(LEARNER_HEADER, learner.to_string());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
