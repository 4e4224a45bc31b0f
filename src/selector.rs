//! Due-set selection and batch sizing.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::Card;
use crate::store::{CardFilter, CardRepository};

/// Default cap on a due-card fetch.
pub const DEFAULT_DUE_LIMIT: usize = 20;

/// How a due set is prioritized when it exceeds the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueOrder {
    /// Ascending `next_review_at`: most overdue first.
    #[default]
    MostOverdue,
    /// Ascending `last_retention`: weakest-retained first. Used by
    /// recommendation flows building a "priority" subset.
    WeakestRetention,
}

pub struct DueSetSelector {
    cards: Arc<dyn CardRepository>,
}

impl DueSetSelector {
    pub fn new(cards: Arc<dyn CardRepository>) -> Self {
        Self { cards }
    }

    /// Cards with `next_review_at <= now`, optionally scoped to a topic,
    /// ordered by priority and capped at `limit`. When more cards are due
    /// than `limit`, the highest-priority subset is returned, never an
    /// arbitrary one.
    pub async fn due_cards(
        &self,
        owner_id: Uuid,
        topic_id: Option<Uuid>,
        limit: usize,
        order: DueOrder,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>, EngineError> {
        let filter = CardFilter {
            topic_id,
            due_before: Some(now),
        };
        let mut due = self.cards.list_cards(owner_id, &filter).await?;

        match order {
            DueOrder::MostOverdue => due.sort_by_key(|c| c.next_review_at),
            DueOrder::WeakestRetention => due.sort_by(|a, b| {
                a.last_retention
                    .partial_cmp(&b.last_retention)
                    .unwrap_or(Ordering::Equal)
            }),
        }

        due.truncate(limit);
        Ok(due)
    }

    /// Count of due cards without fetching them.
    pub async fn due_count(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, EngineError> {
        Ok(self.cards.count_due(owner_id, now).await?)
    }
}

/// Backlog-aware batch size for a study session.
///
/// Small backlogs are taken whole; mid-size backlogs are trimmed to 75%
/// within [5, 15]; growth is capped so high-backlog days don't overwhelm
/// the learner while still making progress.
pub fn recommended_batch_size(due_count: usize) -> usize {
    if due_count <= 5 {
        due_count
    } else if due_count <= 20 {
        ((due_count as f64 * 0.75).round() as usize).clamp(5, 15)
    } else if due_count <= 50 {
        20
    } else {
        25
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;
    use chrono::Duration;

    fn due_card(owner: Uuid, days_overdue: i64, retention: f64) -> Card {
        let mut card = Card::new(owner, None);
        card.next_review_at = Utc::now() - Duration::days(days_overdue);
        card.last_retention = retention;
        card
    }

    #[tokio::test]
    async fn returns_most_overdue_prefix() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let now = Utc::now();

        for days in 1..=10 {
            store
                .insert_card(&due_card(owner, days, 0.5))
                .await
                .unwrap();
        }

        let selector = DueSetSelector::new(store.clone());
        let due = selector
            .due_cards(owner, None, 3, DueOrder::MostOverdue, now)
            .await
            .unwrap();

        assert_eq!(due.len(), 3);
        // Ascending next_review_at: the three most overdue.
        assert!(due[0].next_review_at <= due[1].next_review_at);
        assert!(due[1].next_review_at <= due[2].next_review_at);
        assert_eq!(due[0].next_review_at.date_naive(), (now - Duration::days(10)).date_naive());
    }

    #[tokio::test]
    async fn priority_mode_orders_by_weakest_retention() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let now = Utc::now();

        store.insert_card(&due_card(owner, 1, 0.9)).await.unwrap();
        store.insert_card(&due_card(owner, 2, 0.2)).await.unwrap();
        store.insert_card(&due_card(owner, 3, 0.6)).await.unwrap();

        let selector = DueSetSelector::new(store.clone());
        let due = selector
            .due_cards(owner, None, 10, DueOrder::WeakestRetention, now)
            .await
            .unwrap();

        let retentions: Vec<f64> = due.iter().map(|c| c.last_retention).collect();
        assert_eq!(retentions, vec![0.2, 0.6, 0.9]);
    }

    #[tokio::test]
    async fn future_cards_and_foreign_topics_are_excluded() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let now = Utc::now();

        let mut scoped = due_card(owner, 1, 0.5);
        scoped.topic_id = Some(topic);
        store.insert_card(&scoped).await.unwrap();
        store.insert_card(&due_card(owner, 2, 0.5)).await.unwrap();

        let mut future = due_card(owner, 0, 0.5);
        future.next_review_at = now + Duration::days(3);
        store.insert_card(&future).await.unwrap();

        let selector = DueSetSelector::new(store.clone());
        let all = selector
            .due_cards(owner, None, DEFAULT_DUE_LIMIT, DueOrder::MostOverdue, now)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let only_topic = selector
            .due_cards(owner, Some(topic), DEFAULT_DUE_LIMIT, DueOrder::MostOverdue, now)
            .await
            .unwrap();
        assert_eq!(only_topic.len(), 1);
        assert_eq!(only_topic[0].id, scoped.id);
    }

    #[test]
    fn batch_size_heuristic() {
        assert_eq!(recommended_batch_size(0), 0);
        assert_eq!(recommended_batch_size(5), 5);
        assert_eq!(recommended_batch_size(6), 5); // 4.5 rounds to 5
        assert_eq!(recommended_batch_size(12), 9);
        assert_eq!(recommended_batch_size(20), 15);
        assert_eq!(recommended_batch_size(21), 20);
        assert_eq!(recommended_batch_size(50), 20);
        assert_eq!(recommended_batch_size(51), 25);
        assert_eq!(recommended_batch_size(500), 25);
    }
}
