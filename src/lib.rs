//! Persistence and accounting core for a text-to-speech artifact tracker.
//!
//! The web layer validates input and performs the synthesis call; this crate
//! owns what happens after that: user accounts, audio-record metadata,
//! per-user usage accounting, and playback history, all backed by SQLite via
//! sqlx. On a successful synthesis the caller stores the record with
//! [`AudioRecordStore::create`] and books the usage with
//! [`UsageStatsAggregator::update_stats`]; usage is never inferred from
//! record creation.
//!
//! Stores are stateless handles over a shared [`DbPool`]; every operation is
//! a single bounded engine call or a single transaction, so consistency under
//! concurrent requests comes from per-operation atomicity, not from locks
//! held across calls.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod store;
pub mod views;

pub use config::Config;
pub use db::{create_pool, DbPool};
pub use error::StoreError;
pub use store::{AudioRecordStore, PlaybackHistoryStore, UsageStatsAggregator, UserStore};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for the embedding process.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vocalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
