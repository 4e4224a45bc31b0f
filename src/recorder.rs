//! Records a single review outcome against a card.
//!
//! One call is one logical transaction: read the card, run the scoring
//! model, persist the updated card, then append a review event. The two
//! writes are not atomic across store boundaries; the card write goes
//! first because it is the authoritative scheduling state. A review must
//! never be logged against a card whose schedule wasn't actually
//! advanced.
//!
//! Duplicate submissions for the same card are NOT idempotent: the
//! scoring function would run twice and corrupt the schedule. Callers
//! debounce at their boundary.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{Card, ReviewEvent};
use crate::scoring;
use crate::store::{CardRepository, ReviewLogStore};

/// Result of a successfully scored review.
#[derive(Debug, Clone)]
pub enum ReviewOutcome {
    /// Card update and log append both succeeded.
    Recorded { card: Card, event: ReviewEvent },
    /// Partial success: the schedule advanced but the log append failed.
    /// Statistics will undercount until `retry_log_append` succeeds with
    /// this same event. Do not re-submit the review itself; re-scoring
    /// would double-penalize or double-reward the same answer.
    LogPending { card: Card, event: ReviewEvent },
}

impl ReviewOutcome {
    pub fn card(&self) -> &Card {
        match self {
            ReviewOutcome::Recorded { card, .. } | ReviewOutcome::LogPending { card, .. } => card,
        }
    }
}

pub struct ReviewRecorder {
    cards: Arc<dyn CardRepository>,
    logs: Arc<dyn ReviewLogStore>,
}

impl ReviewRecorder {
    pub fn new(cards: Arc<dyn CardRepository>, logs: Arc<dyn ReviewLogStore>) -> Self {
        Self { cards, logs }
    }

    /// Applies one review outcome to a card's schedule.
    ///
    /// Failure surface:
    /// - `CardNotFound`: nothing persisted, not retried automatically.
    /// - `ScheduleWriteFailed`: nothing persisted, the whole call is safe
    ///   to retry.
    /// - `Ok(LogPending { .. })`: schedule persisted, log append pending;
    ///   retry only the append via [`retry_log_append`](Self::retry_log_append).
    pub async fn record_review(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        outcome_rating: u8,
        reviewed_at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, EngineError> {
        // Clamp to the 1-5 scale.
        let outcome_rating = outcome_rating.clamp(1, 5);

        let card = self
            .cards
            .get_card(owner_id, card_id)
            .await?
            .ok_or(EngineError::CardNotFound { owner_id, card_id })?;

        let previous_days = previous_interval_days(&card);
        let easiness_factor = scoring::update_easiness_factor(card.easiness_factor, outcome_rating);
        let repetition_count =
            scoring::next_repetition_count(card.repetition_count, outcome_rating);
        let interval_days =
            scoring::next_interval_days(repetition_count, easiness_factor, previous_days);

        // Difficulty follows the latest outcome; the retention estimate the
        // card carries forward is computed from the fields it will hold
        // after this update.
        let difficulty = f64::from(outcome_rating);
        let retention = scoring::retention_estimate(difficulty, easiness_factor);
        let mastery = scoring::mastery_level(card.mastery_level, retention, outcome_rating);

        let mut updated = card;
        updated.difficulty = difficulty;
        updated.easiness_factor = easiness_factor;
        updated.repetition_count = repetition_count;
        updated.last_retention = retention;
        updated.mastery_level = mastery;
        updated.last_reviewed_at = Some(reviewed_at);
        updated.next_review_at = reviewed_at + Duration::days(interval_days);

        self.cards
            .update_card_schedule(&updated)
            .await
            .map_err(EngineError::ScheduleWriteFailed)?;

        let event = ReviewEvent::new(owner_id, card_id, outcome_rating, retention, reviewed_at);
        match self.logs.append_review(&event).await {
            Ok(()) => Ok(ReviewOutcome::Recorded {
                card: updated,
                event,
            }),
            Err(err) => {
                warn!(
                    "review log append failed for card {} (schedule already advanced): {}",
                    card_id, err
                );
                Ok(ReviewOutcome::LogPending {
                    card: updated,
                    event,
                })
            }
        }
    }

    /// Retries the log append for a `LogPending` outcome. The append is
    /// idempotent by event id, so retrying after an ambiguous failure
    /// cannot double-count.
    pub async fn retry_log_append(&self, event: &ReviewEvent) -> Result<(), EngineError> {
        self.logs
            .append_review(event)
            .await
            .map_err(EngineError::LogWriteFailed)
    }
}

/// Interval the card was last scheduled with, in whole days. Defaults to
/// 1 when the card has never been reviewed or the delta is degenerate.
fn previous_interval_days(card: &Card) -> i64 {
    match card.last_reviewed_at {
        Some(last) => (card.next_review_at - last).num_days().max(1),
        None => 1,
    }
}
