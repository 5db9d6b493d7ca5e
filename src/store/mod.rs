pub mod audio;
pub mod history;
pub mod stats;
pub mod users;

pub use audio::{AudioRecordStore, NewAudioRecord, UpdateAudioRecord, DEFAULT_CATEGORY};
pub use history::PlaybackHistoryStore;
pub use stats::{GlobalSummary, UsageStatsAggregator};
pub use users::{UserListItem, UserStore};
