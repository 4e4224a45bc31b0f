//! Spaced-repetition scheduling engine.
//!
//! The library core of a learning platform: decides, per learner and per
//! card, when the next review is due, how retrievability evolves from
//! review outcomes, and how due work is batched into sessions and planned
//! across a calendar. It is consumed as a library; there is no network
//! surface of its own.
//!
//! - [`scoring`] — pure SM-2 style scoring functions
//! - [`store`] — `CardRepository` / `ReviewLogStore` boundaries
//! - [`db`] — sqlx/SQLite implementation of both stores
//! - [`recorder`] — one review transaction, card write before log append
//! - [`selector`] — due-set selection and batch sizing
//! - [`stats`] — dashboard counters and retention ratios
//! - [`planner`] — forward calendar planning

pub mod db;
pub mod error;
pub mod models;
pub mod planner;
pub mod recorder;
pub mod scoring;
pub mod selector;
pub mod stats;
pub mod store;


pub use db::SqliteStore;
pub use error::{EngineError, StoreError};
pub use models::{
    Card, DailySchedule, RetentionBucket, RetentionReport, ReviewEvent, ScheduleEntry,
    StatsSummary,
};
pub use planner::{plan_schedule, ScheduleWindow};
pub use recorder::{ReviewOutcome, ReviewRecorder};
pub use selector::{recommended_batch_size, DueOrder, DueSetSelector};
pub use stats::StatsAggregator;
pub use store::{CardFilter, CardRepository, ReviewFilter, ReviewLogStore};
