use thiserror::Error;
use uuid::Uuid;

/// Failure at the storage boundary. The engine never interprets these
/// beyond "the write/read did not happen"; retry policy lives with the
/// caller per the recorder contract.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Catch-all for non-database backends (and for test doubles that
    /// inject failures).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Engine-level error taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A review was submitted for an id the owner doesn't have. Not
    /// retried automatically.
    #[error("card {card_id} not found for owner {owner_id}")]
    CardNotFound { owner_id: Uuid, card_id: Uuid },

    /// The card update itself failed. Nothing was persisted, so the whole
    /// `record_review` call is safe to retry.
    #[error("card schedule write failed: {0}")]
    ScheduleWriteFailed(#[source] StoreError),

    /// A retried review-log append failed again. Only `retry_log_append`
    /// reports this; the original call surfaces the pending log through
    /// `ReviewOutcome::LogPending` instead, because the schedule write
    /// already succeeded.
    #[error("review log write failed: {0}")]
    LogWriteFailed(#[source] StoreError),

    /// A planning request that cannot produce any meaningful schedule,
    /// e.g. a zero minute budget.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A read against the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
