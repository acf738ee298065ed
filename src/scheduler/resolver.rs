use std::sync::Arc;

use uuid::Uuid;

use super::store::ItemCatalog;
use super::types::ItemId;
use super::SchedulerError;

pub const SEARCH_LIMIT: usize = 20;

/// Maps a caller identifier (UUID or free text) to a catalog id.
#[derive(Clone)]
pub struct WordResolver {
    catalog: Arc<dyn ItemCatalog>,
}

impl WordResolver {
    pub fn new(catalog: Arc<dyn ItemCatalog>) -> Self {
        Self { catalog }
    }

    /// UUIDs pass through without an existence check; anything else is a
    /// prefix search and the first hit wins.
    pub async fn resolve(&self, identifier: &str) -> Result<ItemId, SchedulerError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(SchedulerError::Validation(
                "word identifier must not be empty".to_string(),
            ));
        }

        if let Ok(id) = Uuid::parse_str(identifier) {
            return Ok(id);
        }

        tracing::debug!(word = identifier, "identifier is not a UUID, searching catalog");
        let matches = self
            .catalog
            .search_by_text(identifier, SEARCH_LIMIT)
            .await?;

        matches
            .first()
            .map(|item| item.id)
            .ok_or_else(|| SchedulerError::NotFound(format!("word '{identifier}' not found")))
    }
}
