use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::catalog::{escape_like, map_item};
use crate::scheduler::{
    DetailOverrides, EnrolledWord, ItemId, LearnerId, LevelProgress, MasteryRecord,
    ProgressStore, ProgressSummary, RecordLookup, StoreError, Tier, WordOrder,
};

const RECORD_COLUMNS: &str = r#""user_id", "word_id", "is_learned", "correct_streak",
    "difficulty_level", "last_seen", "custom_translation", "custom_transcription",
    "custom_synonyms""#;

/// Predicates below must agree with `MasteryState::classify`.
const UNSEEN_PREDICATE: &str =
    r#"NOT "is_learned" AND "total_mistakes" = 0 AND "correct_streak" = 0"#;
const STRUGGLING_PREDICATE: &str =
    r#"NOT "is_learned" AND ("total_mistakes" > 0 OR "correct_streak" > 0)"#;
const MASTERED_PREDICATE: &str = r#""is_learned""#;

/// `$1` learner, `$2` optional escaped prefix.
const LIST_FROM: &str = r#"FROM "user_progress" up
    JOIN "dictionary" d ON d."id" = up."word_id"
    WHERE up."user_id" = $1
      AND ($2::text IS NULL OR d."original" ILIKE $2 || '%' OR d."translation" ILIKE $2 || '%')"#;

/// `user_progress` table access.
#[derive(Clone)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tier_query(tier: Tier) -> String {
    let (predicate, order) = match tier {
        Tier::New => (UNSEEN_PREDICATE, r#""last_seen" ASC"#),
        Tier::Struggling => (
            STRUGGLING_PREDICATE,
            r#""difficulty_level" DESC, "last_seen" ASC"#,
        ),
        Tier::Review => (MASTERED_PREDICATE, r#""last_seen" ASC"#),
    };
    format!(
        r#"SELECT {RECORD_COLUMNS} FROM "user_progress"
        WHERE "user_id" = $1 AND {predicate}
        ORDER BY {order}
        LIMIT $2"#
    )
}

fn list_words_query(order: WordOrder) -> String {
    format!(
        r#"SELECT d.*, up."is_learned", up."correct_streak", up."total_mistakes",
            up."difficulty_level", up."last_seen", up."custom_translation",
            up."custom_transcription", up."custom_synonyms"
        {LIST_FROM}
        ORDER BY d."original" {}
        LIMIT $3 OFFSET $4"#,
        order.as_sql()
    )
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn map_record(row: &PgRow) -> Result<MasteryRecord, sqlx::Error> {
    let correct_streak: i32 = row.try_get("correct_streak")?;
    Ok(MasteryRecord {
        learner_id: row.try_get("user_id")?,
        item_id: row.try_get("word_id")?,
        is_mastered: row.try_get("is_learned")?,
        correct_streak: u32::try_from(correct_streak).unwrap_or(0),
        mistake_delta: 0,
        difficulty: row.try_get("difficulty_level")?,
        last_seen_at: row.try_get("last_seen")?,
        overrides: DetailOverrides {
            translation: row.try_get("custom_translation")?,
            transcription: row.try_get("custom_transcription")?,
            synonyms: row.try_get("custom_synonyms")?,
        },
    })
}

fn map_enrolled(row: &PgRow) -> Result<EnrolledWord, sqlx::Error> {
    let correct_streak: i32 = row.try_get("correct_streak")?;
    let total_mistakes: i32 = row.try_get("total_mistakes")?;
    Ok(EnrolledWord {
        item: map_item(row)?,
        is_mastered: row.try_get("is_learned")?,
        correct_streak: u32::try_from(correct_streak).unwrap_or(0),
        total_mistakes: u64::try_from(total_mistakes).unwrap_or(0),
        difficulty: row.try_get("difficulty_level")?,
        last_seen_at: row.try_get("last_seen")?,
        overrides: DetailOverrides {
            translation: row.try_get("custom_translation")?,
            transcription: row.try_get("custom_transcription")?,
            synonyms: row.try_get("custom_synonyms")?,
        },
    })
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn get_record(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<RecordLookup, StoreError> {
        let sql = format!(
            r#"SELECT {RECORD_COLUMNS} FROM "user_progress" WHERE "user_id" = $1 AND "word_id" = $2"#
        );
        let row = sqlx::query(&sql)
            .bind(learner_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(RecordLookup::Existing(map_record(&row)?)),
            None => Ok(RecordLookup::NotYetCreated),
        }
    }

    async fn upsert_record(&self, record: &MasteryRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "user_progress"
                ("user_id", "word_id", "is_learned", "correct_streak", "total_mistakes",
                 "difficulty_level", "last_seen")
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ("user_id", "word_id") DO UPDATE SET
                "is_learned" = EXCLUDED."is_learned",
                "correct_streak" = EXCLUDED."correct_streak",
                "total_mistakes" = "user_progress"."total_mistakes" + EXCLUDED."total_mistakes",
                "difficulty_level" = EXCLUDED."difficulty_level",
                "last_seen" = EXCLUDED."last_seen"
            "#,
        )
        .bind(record.learner_id)
        .bind(record.item_id)
        .bind(record.is_mastered)
        .bind(to_i32(record.correct_streak))
        .bind(to_i32(record.mistake_delta))
        .bind(record.difficulty)
        .bind(record.last_seen_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_overrides(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        overrides: &DetailOverrides,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "user_progress"
                ("user_id", "word_id", "last_seen",
                 "custom_translation", "custom_transcription", "custom_synonyms")
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ("user_id", "word_id") DO UPDATE SET
                "custom_translation" = EXCLUDED."custom_translation",
                "custom_transcription" = EXCLUDED."custom_transcription",
                "custom_synonyms" = EXCLUDED."custom_synonyms",
                "last_seen" = EXCLUDED."last_seen"
            "#,
        )
        .bind(learner_id)
        .bind(item_id)
        .bind(at)
        .bind(overrides.translation.as_deref())
        .bind(overrides.transcription.as_deref())
        .bind(overrides.synonyms.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_record(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query(r#"DELETE FROM "user_progress" WHERE "user_id" = $1 AND "word_id" = $2"#)
                .bind(learner_id)
                .bind(item_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_records(&self, learner_id: LearnerId) -> Result<u64, StoreError> {
        let result = sqlx::query(r#"DELETE FROM "user_progress" WHERE "user_id" = $1"#)
            .bind(learner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_tier(
        &self,
        learner_id: LearnerId,
        tier: Tier,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        let sql = tier_query(tier);
        let rows = sqlx::query(&sql)
            .bind(learner_id)
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| map_record(row).map_err(StoreError::from))
            .collect()
    }

    async fn find_random(
        &self,
        learner_id: LearnerId,
        exclude_ids: &[ItemId],
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        let sql = format!(
            r#"SELECT {RECORD_COLUMNS} FROM "user_progress"
            WHERE "user_id" = $1 AND "word_id" <> ALL($2)
            ORDER BY RANDOM()
            LIMIT $3"#
        );
        let rows = sqlx::query(&sql)
            .bind(learner_id)
            .bind(exclude_ids)
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| map_record(row).map_err(StoreError::from))
            .collect()
    }

    async fn enroll(
        &self,
        learner_id: LearnerId,
        item_ids: &[ItemId],
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        if item_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO "user_progress" ("user_id", "word_id", "last_seen")
            SELECT $1, "ids"."word_id", $3
            FROM UNNEST($2::uuid[]) AS "ids"("word_id")
            ON CONFLICT ("user_id", "word_id") DO NOTHING
            "#,
        )
        .bind(learner_id)
        .bind(item_ids)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_by_state(&self, learner_id: LearnerId) -> Result<ProgressSummary, StoreError> {
        let sql = format!(
            r#"SELECT
                COUNT(*) FILTER (WHERE {UNSEEN_PREDICATE}) AS "unseen",
                COUNT(*) FILTER (WHERE {STRUGGLING_PREDICATE}) AS "struggling",
                COUNT(*) FILTER (WHERE {MASTERED_PREDICATE}) AS "mastered"
            FROM "user_progress"
            WHERE "user_id" = $1"#
        );
        let row = sqlx::query(&sql)
            .bind(learner_id)
            .fetch_one(&self.pool)
            .await?;

        let unseen: i64 = row.try_get("unseen")?;
        let struggling: i64 = row.try_get("struggling")?;
        let mastered: i64 = row.try_get("mastered")?;
        Ok(ProgressSummary::from_counts(
            unseen.max(0) as u64,
            struggling.max(0) as u64,
            mastered.max(0) as u64,
        ))
    }

    async fn list_words(
        &self,
        learner_id: LearnerId,
        filter: Option<&str>,
        order: WordOrder,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<EnrolledWord>, u64), StoreError> {
        let pattern = filter.map(escape_like);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {LIST_FROM}"))
            .bind(learner_id)
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = list_words_query(order);
        let rows = sqlx::query(&sql)
            .bind(learner_id)
            .bind(pattern.as_deref())
            .bind(to_limit(limit))
            .bind(to_limit(offset))
            .fetch_all(&self.pool)
            .await?;
        let words = rows
            .iter()
            .map(|row| map_enrolled(row).map_err(StoreError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((words, total.max(0) as u64))
    }

    async fn progress_by_level(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LevelProgress>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT d."level" AS "level",
                COUNT(*) AS "total",
                COUNT(*) FILTER (WHERE up."is_learned") AS "mastered"
            FROM "user_progress" up
            JOIN "dictionary" d ON d."id" = up."word_id"
            WHERE up."user_id" = $1
            GROUP BY d."level"
            ORDER BY d."level""#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<LevelProgress, StoreError> {
                let total: i64 = row.try_get("total")?;
                let mastered: i64 = row.try_get("mastered")?;
                Ok(LevelProgress {
                    level: row.try_get("level")?,
                    total: total.max(0) as u64,
                    mastered: mastered.max(0) as u64,
                })
            })
            .collect()
    }
}
