pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod scheduler;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::config::DbConfig;
use crate::db::memory::MemoryStore;
use crate::db::{DatabaseProxy, DbInitError};
use crate::state::AppState;

/// PostgreSQL when `DATABASE_URL` is set, otherwise an empty in-memory store.
pub async fn init_state(config: &Config) -> Result<AppState, DbInitError> {
    match DbConfig::from_env() {
        Ok(db_config) => {
            let proxy = DatabaseProxy::connect(db_config).await?;
            Ok(AppState::with_database(proxy, config.scheduler.clone()))
        }
        Err(err) => {
            tracing::warn!(error = %err, "database not configured, using in-memory store");
            Ok(AppState::with_memory(
                std::sync::Arc::new(MemoryStore::new()),
                config.scheduler.clone(),
            ))
        }
    }
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
