//! Derived metrics over cards and review history.
//!
//! Everything here is a read-only scan scoped to one owner. Empty input
//! is an expected steady state for new learners; every metric returns a
//! zeroed or neutral default instead of failing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{RetentionBucket, RetentionReport, StatsSummary, NEUTRAL_DIFFICULTY};
use crate::store::{CardFilter, CardRepository, ReviewFilter, ReviewLogStore};

/// Mastery level at or above which a card counts as mastered.
pub const MASTERY_THRESHOLD: f64 = 0.8;

pub struct StatsAggregator {
    cards: Arc<dyn CardRepository>,
    logs: Arc<dyn ReviewLogStore>,
}

impl StatsAggregator {
    pub fn new(cards: Arc<dyn CardRepository>, logs: Arc<dyn ReviewLogStore>) -> Self {
        Self { cards, logs }
    }

    /// Dashboard counters for one learner. `now` supplies the day
    /// boundary for "today"; callers wanting local days pass a
    /// local-shifted timestamp.
    pub async fn stats(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StatsSummary, EngineError> {
        let cards = self
            .cards
            .list_cards(owner_id, &CardFilter::default())
            .await?;

        let total_cards = cards.len();
        let mastered_cards = cards
            .iter()
            .filter(|c| c.mastery_level >= MASTERY_THRESHOLD)
            .count();
        let due_cards = cards.iter().filter(|c| c.is_due(now)).count();
        let average_difficulty = if cards.is_empty() {
            NEUTRAL_DIFFICULTY
        } else {
            cards.iter().map(|c| c.difficulty).sum::<f64>() / cards.len() as f64
        };

        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1) - Duration::nanoseconds(1);
        let reviews_today = self
            .logs
            .count_reviews_between(owner_id, day_start, day_end)
            .await? as usize;

        let streak_days = self.streak_days(owner_id, now).await?;

        Ok(StatsSummary {
            total_cards,
            mastered_cards,
            due_cards,
            average_difficulty,
            reviews_today,
            streak_days,
        })
    }

    /// Retention ratios: overall, per card, and per calendar day.
    /// "Remembered" means an outcome rating of 3 or better. Every ratio
    /// is 0 (never NaN) when its denominator is 0.
    pub async fn retention(&self, owner_id: Uuid) -> Result<RetentionReport, EngineError> {
        let reviews = self
            .logs
            .list_reviews(owner_id, &ReviewFilter::default())
            .await?;

        let mut overall = (0usize, 0usize);
        let mut per_card: HashMap<Uuid, (usize, usize)> = HashMap::new();
        let mut per_day: BTreeMap<chrono::NaiveDate, (usize, usize)> = BTreeMap::new();

        for event in &reviews {
            let remembered = usize::from(event.remembered());
            overall.0 += 1;
            overall.1 += remembered;

            let card = per_card.entry(event.card_id).or_default();
            card.0 += 1;
            card.1 += remembered;

            let day = per_day.entry(event.reviewed_at.date_naive()).or_default();
            day.0 += 1;
            day.1 += remembered;
        }

        Ok(RetentionReport {
            overall: RetentionBucket::from_counts(overall.0, overall.1),
            per_card: per_card
                .into_iter()
                .map(|(id, (t, r))| (id, RetentionBucket::from_counts(t, r)))
                .collect(),
            per_day: per_day
                .into_iter()
                .map(|(d, (t, r))| (d, RetentionBucket::from_counts(t, r)))
                .collect(),
        })
    }

    /// Consecutive calendar days with at least one review, ending at
    /// `now`'s day. A day with no reviews *yet* doesn't break the streak;
    /// the run may end yesterday instead.
    async fn streak_days(
        &self,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u32, EngineError> {
        let reviews = self
            .logs
            .list_reviews(owner_id, &ReviewFilter::default())
            .await?;

        let days: BTreeSet<chrono::NaiveDate> =
            reviews.iter().map(|e| e.reviewed_at.date_naive()).collect();

        let today = now.date_naive();
        let mut cursor = if days.contains(&today) {
            today
        } else {
            today - Duration::days(1)
        };

        let mut streak = 0u32;
        while days.contains(&cursor) {
            streak += 1;
            cursor = cursor - Duration::days(1);
        }
        Ok(streak)
    }
}
