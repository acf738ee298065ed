use std::sync::Arc;
use std::time::Instant;

use crate::db::memory::MemoryStore;
use crate::db::DatabaseProxy;
use crate::scheduler::{ProgressStore, Scheduler, SchedulerConfig, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    scheduler: Arc<Scheduler>,
    db_proxy: Option<Arc<DatabaseProxy>>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>, db_proxy: Option<Arc<DatabaseProxy>>) -> Self {
        Self {
            started_at: Instant::now(),
            scheduler,
            db_proxy,
        }
    }

    /// Scheduler over the PostgreSQL store and catalog.
    pub fn with_database(proxy: Arc<DatabaseProxy>, config: SchedulerConfig) -> Self {
        let scheduler = Scheduler::new(
            Arc::new(proxy.progress_store()),
            Arc::new(proxy.catalog()),
            config,
            Arc::new(SystemClock),
            tracing::info_span!("scheduler", backend = StorageBackend::Postgres.as_str()),
        );
        Self::new(Arc::new(scheduler), Some(proxy))
    }

    /// Scheduler over a process-local store; used without `DATABASE_URL` and in tests.
    pub fn with_memory(store: Arc<MemoryStore>, config: SchedulerConfig) -> Self {
        let progress: Arc<dyn ProgressStore> = store.clone();
        let scheduler = Scheduler::new(
            progress,
            store,
            config,
            Arc::new(SystemClock),
            tracing::info_span!("scheduler", backend = StorageBackend::Memory.as_str()),
        );
        Self::new(Arc::new(scheduler), None)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn backend(&self) -> StorageBackend {
        if self.db_proxy.is_some() {
            StorageBackend::Postgres
        } else {
            StorageBackend::Memory
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_state_has_no_database() {
        let state = AppState::with_memory(Arc::new(MemoryStore::new()), SchedulerConfig::default());
        assert_eq!(state.backend(), StorageBackend::Memory);
        assert!(state.db_proxy().is_none());
    }
}
