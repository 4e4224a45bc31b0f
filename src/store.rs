//! Storage trait boundaries for the scheduling engine.
//!
//! The engine assumes an external relational store reachable through a
//! query interface; these traits are that boundary. Both stores filter by
//! owner, by topic and by timestamp comparison, and can count without
//! materializing rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Card, ReviewEvent};

/// Filter for card listings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub topic_id: Option<Uuid>,
    /// Only cards with `next_review_at <= due_before`.
    pub due_before: Option<DateTime<Utc>>,
}

/// Filter for review-log listings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub card_id: Option<Uuid>,
    /// Inclusive lower bound on `reviewed_at`.
    pub reviewed_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `reviewed_at`.
    pub reviewed_before: Option<DateTime<Utc>>,
}

/// Fetch and update of card scheduling state, keyed by owner and card id.
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn get_card(&self, owner_id: Uuid, card_id: Uuid)
        -> Result<Option<Card>, StoreError>;

    /// Persist the card's scheduling fields. The card is the authoritative
    /// scheduling state; the recorder always writes it before the review
    /// log.
    async fn update_card_schedule(&self, card: &Card) -> Result<(), StoreError>;

    async fn list_cards(
        &self,
        owner_id: Uuid,
        filter: &CardFilter,
    ) -> Result<Vec<Card>, StoreError>;

    /// Authoring-side insert. The engine itself never creates cards; this
    /// exists so callers (and tests) can seed the store.
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError>;

    /// Count of cards due at `now`, without materializing them.
    async fn count_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Append-only store of individual review events.
#[async_trait]
pub trait ReviewLogStore: Send + Sync {
    /// Append one event. Must be idempotent by event id so a reported
    /// partial success can be retried without double-counting.
    async fn append_review(&self, event: &ReviewEvent) -> Result<(), StoreError>;

    async fn list_reviews(
        &self,
        owner_id: Uuid,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewEvent>, StoreError>;

    /// Count of events with `reviewed_at` in `[from, to]`.
    async fn count_reviews_between(
        &self,
        owner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}
