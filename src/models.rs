use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Default easiness factor for a freshly authored card (SM-2 convention).
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;

/// Neutral difficulty on the 1-5 scale, also the reported average when a
/// learner has no cards yet.
pub const NEUTRAL_DIFFICULTY: f64 = 3.0;

/// A single learnable prompt/answer item with its own schedule.
///
/// Owned by exactly one learner, optionally tagged with a topic. Scheduling
/// fields are mutated only by the review recorder; authoring and deletion
/// are external CRUD concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub topic_id: Option<Uuid>,
    // Scheduling fields
    pub difficulty: f64, // 1-5, tracks the latest outcome rating
    pub easiness_factor: f64, // >= 1.3
    pub repetition_count: u32,
    pub mastery_level: f64, // 0-1
    pub last_retention: f64, // 0-1
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl Card {
    /// A fresh card with default scheduling fields, due immediately.
    pub fn new(owner_id: Uuid, topic_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            topic_id,
            difficulty: NEUTRAL_DIFFICULTY,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            repetition_count: 0,
            mastery_level: 0.0,
            last_retention: 0.0,
            next_review_at: Utc::now(),
            last_reviewed_at: None,
        }
    }

    /// Whether the card is due for review at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

/// An immutable record of one review outcome. Append-only: once written it
/// is never mutated or deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub card_id: Uuid,
    /// 1 = total failure, 5 = perfect recall.
    pub outcome_rating: u8,
    /// Retrievability estimate computed at review time (0-1).
    pub retention_estimate: f64,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewEvent {
    pub fn new(
        owner_id: Uuid,
        card_id: Uuid,
        outcome_rating: u8,
        retention_estimate: f64,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            card_id,
            outcome_rating,
            retention_estimate,
            reviewed_at,
        }
    }

    /// A rating of 3 or better counts as remembered.
    pub fn remembered(&self) -> bool {
        self.outcome_rating >= 3
    }
}

/// One card slot inside a planned study day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub card_id: Uuid,
    pub allocated_minutes: u32,
}

/// A planned study day. Produced on demand by the session planner, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub entries: Vec<ScheduleEntry>,
    pub total_minutes: u32,
    /// Set when the day's own due cards alone exceed the daily budget.
    /// Due cards are never truncated, only backlog backfill is capped.
    pub over_budget: bool,
}

/// Dashboard counters for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_cards: usize,
    pub mastered_cards: usize,
    pub due_cards: usize,
    pub average_difficulty: f64,
    pub reviews_today: usize,
    /// Consecutive calendar days with at least one review, ending today
    /// (or yesterday if today has none yet).
    pub streak_days: u32,
}

impl Default for StatsSummary {
    fn default() -> Self {
        Self {
            total_cards: 0,
            mastered_cards: 0,
            due_cards: 0,
            average_difficulty: NEUTRAL_DIFFICULTY,
            reviews_today: 0,
            streak_days: 0,
        }
    }
}

/// Remembered-over-total ratio for one grouping of reviews.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionBucket {
    pub total: usize,
    pub remembered: usize,
    pub rate: f64,
}

impl RetentionBucket {
    pub fn from_counts(total: usize, remembered: usize) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            remembered as f64 / total as f64
        };
        Self {
            total,
            remembered,
            rate,
        }
    }
}

/// Retention ratios for a learner, overall and grouped by card and by
/// calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionReport {
    pub overall: RetentionBucket,
    pub per_card: HashMap<Uuid, RetentionBucket>,
    pub per_day: BTreeMap<NaiveDate, RetentionBucket>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_card_is_due_immediately() {
        let card = Card::new(Uuid::new_v4(), None);
        assert_eq!(card.easiness_factor, DEFAULT_EASINESS_FACTOR);
        assert_eq!(card.repetition_count, 0);
        assert!(card.last_reviewed_at.is_none());
        assert!(card.is_due(Utc::now()));
    }

    #[test]
    fn retention_bucket_zero_total_has_zero_rate() {
        let bucket = RetentionBucket::from_counts(0, 0);
        assert_eq!(bucket.rate, 0.0);

        let bucket = RetentionBucket::from_counts(4, 3);
        assert_eq!(bucket.rate, 0.75);
    }

    #[test]
    fn empty_stats_report_neutral_difficulty() {
        let stats = StatsSummary::default();
        assert_eq!(stats.total_cards, 0);
        assert_eq!(stats.average_difficulty, NEUTRAL_DIFFICULTY);
    }

    #[test]
    fn card_serializes_with_snake_case_fields() {
        let card = Card::new(Uuid::new_v4(), None);
        let json = serde_json::to_value(&card).unwrap();
        assert!(json.get("easiness_factor").is_some());
        assert!(json.get("next_review_at").is_some());
    }
}
