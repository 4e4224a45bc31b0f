//! SQLite implementation of the storage boundary, via sqlx.
//!
//! The engine itself is store-agnostic; this is the implementation a
//! single-node deployment runs on. Uuids are stored as TEXT, timestamps
//! as DATETIME columns mapped through chrono.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteRow, SqliteSynchronous,
};
use sqlx::{ConnectOptions, Pool, Row, Sqlite};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Card, ReviewEvent};
use crate::store::{CardFilter, CardRepository, ReviewFilter, ReviewLogStore};

fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Card {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let topic_id = match row.try_get::<Option<String>, _>("topic_id")? {
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?),
            None => None,
        };

        Ok(Card {
            id: uuid_column(row, "id")?,
            owner_id: uuid_column(row, "owner_id")?,
            topic_id,
            difficulty: row.try_get("difficulty")?,
            easiness_factor: row.try_get("easiness_factor")?,
            repetition_count: row.try_get::<i64, _>("repetition_count")? as u32,
            mastery_level: row.try_get("mastery_level")?,
            last_retention: row.try_get("last_retention")?,
            next_review_at: row.try_get("next_review_at")?,
            last_reviewed_at: row.try_get("last_reviewed_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for ReviewEvent {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ReviewEvent {
            id: uuid_column(row, "id")?,
            owner_id: uuid_column(row, "owner_id")?,
            card_id: uuid_column(row, "card_id")?,
            outcome_rating: row.try_get::<i64, _>("outcome_rating")? as u8,
            retention_estimate: row.try_get("retention_estimate")?,
            reviewed_at: row.try_get("reviewed_at")?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (and if necessary creates) the database named by
    /// `DATABASE_URL`, falling back to a local file.
    pub async fn connect_from_env() -> Result<Self, StoreError> {
        let url = dotenvy::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://recall.db?mode=rwc".to_string());
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .log_statements(log::LevelFilter::Trace);

        let pool = SqlitePool::connect_with(options).await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        info!("sqlite store ready at {}", url);

        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                topic_id TEXT,
                difficulty REAL NOT NULL DEFAULT 3.0,
                easiness_factor REAL NOT NULL DEFAULT 2.5,
                repetition_count INTEGER NOT NULL DEFAULT 0,
                mastery_level REAL NOT NULL DEFAULT 0.0,
                last_retention REAL NOT NULL DEFAULT 0.0,
                next_review_at DATETIME NOT NULL,
                last_reviewed_at DATETIME
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                card_id TEXT NOT NULL,
                outcome_rating INTEGER NOT NULL,
                retention_estimate REAL NOT NULL,
                reviewed_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cards_owner_due ON cards(owner_id, next_review_at)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reviews_owner_time ON reviews(owner_id, reviewed_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CardRepository for SqliteStore {
    async fn get_card(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
    ) -> Result<Option<Card>, StoreError> {
        let card = sqlx::query_as::<_, Card>(
            "SELECT * FROM cards WHERE owner_id = ?1 AND id = ?2",
        )
        .bind(owner_id.to_string())
        .bind(card_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn update_card_schedule(&self, card: &Card) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE cards SET
                difficulty = ?1,
                easiness_factor = ?2,
                repetition_count = ?3,
                mastery_level = ?4,
                last_retention = ?5,
                next_review_at = ?6,
                last_reviewed_at = ?7
            WHERE owner_id = ?8 AND id = ?9
            "#,
        )
        .bind(card.difficulty)
        .bind(card.easiness_factor)
        .bind(card.repetition_count as i64)
        .bind(card.mastery_level)
        .bind(card.last_retention)
        .bind(card.next_review_at)
        .bind(card.last_reviewed_at)
        .bind(card.owner_id.to_string())
        .bind(card.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_cards(
        &self,
        owner_id: Uuid,
        filter: &CardFilter,
    ) -> Result<Vec<Card>, StoreError> {
        // NULL binds collapse the optional clauses.
        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT * FROM cards
            WHERE owner_id = ?1
                AND (?2 IS NULL OR topic_id = ?2)
                AND (?3 IS NULL OR next_review_at <= ?3)
            ORDER BY next_review_at ASC
            "#,
        )
        .bind(owner_id.to_string())
        .bind(filter.topic_id.map(|t| t.to_string()))
        .bind(filter.due_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cards (
                id, owner_id, topic_id, difficulty, easiness_factor,
                repetition_count, mastery_level, last_retention,
                next_review_at, last_reviewed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(card.id.to_string())
        .bind(card.owner_id.to_string())
        .bind(card.topic_id.map(|t| t.to_string()))
        .bind(card.difficulty)
        .bind(card.easiness_factor)
        .bind(card.repetition_count as i64)
        .bind(card.mastery_level)
        .bind(card.last_retention)
        .bind(card.next_review_at)
        .bind(card.last_reviewed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM cards WHERE owner_id = ?1 AND next_review_at <= ?2",
        )
        .bind(owner_id.to_string())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}

#[async_trait]
impl ReviewLogStore for SqliteStore {
    async fn append_review(&self, event: &ReviewEvent) -> Result<(), StoreError> {
        // OR IGNORE keyed on the event id makes a retried append a no-op.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO reviews (
                id, owner_id, card_id, outcome_rating, retention_estimate, reviewed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.owner_id.to_string())
        .bind(event.card_id.to_string())
        .bind(i64::from(event.outcome_rating))
        .bind(event.retention_estimate)
        .bind(event.reviewed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_reviews(
        &self,
        owner_id: Uuid,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewEvent>, StoreError> {
        let reviews = sqlx::query_as::<_, ReviewEvent>(
            r#"
            SELECT * FROM reviews
            WHERE owner_id = ?1
                AND (?2 IS NULL OR card_id = ?2)
                AND (?3 IS NULL OR reviewed_at >= ?3)
                AND (?4 IS NULL OR reviewed_at <= ?4)
            ORDER BY reviewed_at ASC
            "#,
        )
        .bind(owner_id.to_string())
        .bind(filter.card_id.map(|c| c.to_string()))
        .bind(filter.reviewed_after)
        .bind(filter.reviewed_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn count_reviews_between(
        &self,
        owner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM reviews WHERE owner_id = ?1 AND reviewed_at >= ?2 AND reviewed_at <= ?3",
        )
        .bind(owner_id.to_string())
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}
