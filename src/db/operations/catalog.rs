use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::scheduler::{CatalogItem, ItemCatalog, ItemId, StoreError};

const ITEM_COLUMNS: &str = r#""id", "original", "translation", "transcription", "pos", "level",
    "past_simple_singular", "past_simple_plural", "past_participle_singular",
    "past_participle_plural", "synonyms""#;

/// Read-only access to the `dictionary` table.
#[derive(Clone)]
pub struct PgItemCatalog {
    pool: PgPool,
}

impl PgItemCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `ILIKE` wildcards so user input matches literally.
pub(super) fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub(super) fn map_item(row: &PgRow) -> Result<CatalogItem, sqlx::Error> {
    Ok(CatalogItem {
        id: row.try_get("id")?,
        original: row.try_get("original")?,
        translation: row.try_get("translation")?,
        transcription: row.try_get("transcription")?,
        pos: row.try_get("pos")?,
        level: row.try_get("level")?,
        past_simple_singular: row.try_get("past_simple_singular")?,
        past_simple_plural: row.try_get("past_simple_plural")?,
        past_participle_singular: row.try_get("past_participle_singular")?,
        past_participle_plural: row.try_get("past_participle_plural")?,
        synonyms: row.try_get("synonyms")?,
    })
}

fn map_items(rows: &[PgRow]) -> Result<Vec<CatalogItem>, StoreError> {
    rows.iter()
        .map(|row| map_item(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl ItemCatalog for PgItemCatalog {
    async fn search_by_text(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, StoreError> {
        let sql = format!(
            r#"SELECT {ITEM_COLUMNS} FROM "dictionary"
            WHERE "original" ILIKE $1 || '%' OR "translation" ILIKE $1 || '%'
            ORDER BY "original" ASC
            LIMIT $2"#
        );
        let rows = sqlx::query(&sql)
            .bind(escape_like(prefix))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        map_items(&rows)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<CatalogItem>, StoreError> {
        let sql = format!(r#"SELECT {ITEM_COLUMNS} FROM "dictionary" WHERE "id" = $1"#);
        let row = sqlx::query(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_item).transpose()?)
    }

    async fn get_items(
        &self,
        item_ids: &[ItemId],
    ) -> Result<HashMap<ItemId, CatalogItem>, StoreError> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(r#"SELECT {ITEM_COLUMNS} FROM "dictionary" WHERE "id" = ANY($1)"#);
        let rows = sqlx::query(&sql)
            .bind(item_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_items(&rows)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect())
    }

    async fn ids_by_level(&self, level: &str) -> Result<Vec<ItemId>, StoreError> {
        let ids: Vec<ItemId> = sqlx::query_scalar(
            r#"SELECT "id" FROM "dictionary" WHERE "level" = $1 ORDER BY "original" ASC"#,
        )
        .bind(level)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("run"), "run");
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }
}
