use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::FromRow;

use crate::error::StoreError;

#[derive(Debug, Clone, FromRow)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub password_hash: String,
  pub email: Option<String>,
  pub is_admin: bool,
  pub created_at: i64,
}

/// Lifecycle of an audio record. `Deleted` always carries the deletion
/// timestamp, so the stored pair (is_deleted, deleted_at) cannot disagree
/// anywhere above the row mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Active,
  Deleted { at: i64 },
}

impl Lifecycle {
  pub fn is_deleted(&self) -> bool {
    matches!(self, Lifecycle::Deleted { .. })
  }

  pub fn deleted_at(&self) -> Option<i64> {
    match self {
      Lifecycle::Active => None,
      Lifecycle::Deleted { at } => Some(*at),
    }
  }
}

/// Metadata for one synthesized audio file. Everything except display_name,
/// category and the lifecycle state is fixed at creation.
#[derive(Debug, Clone)]
pub struct AudioRecord {
  pub id: i64,
  pub user_id: i64,
  pub filename: String,
  pub display_name: String,
  pub category: String,
  pub voice: String,
  pub speed: f64,
  pub character_count: i64,
  pub cost: f64,
  pub text_preview: String,
  pub created_at: i64,
  pub state: Lifecycle,
}

/// Raw table shape for audio_records.
#[derive(Debug, Clone, FromRow)]
pub struct AudioRecordRow {
  pub id: i64,
  pub user_id: i64,
  pub filename: String,
  pub display_name: String,
  pub category: String,
  pub voice: String,
  pub speed: f64,
  pub character_count: i64,
  pub cost: f64,
  pub text_preview: String,
  pub created_at: i64,
  pub is_deleted: bool,
  pub deleted_at: Option<i64>,
}

impl TryFrom<AudioRecordRow> for AudioRecord {
  type Error = StoreError;

  fn try_from(row: AudioRecordRow) -> Result<Self, Self::Error> {
    let state = match (row.is_deleted, row.deleted_at) {
      (false, None) => Lifecycle::Active,
      (true, Some(at)) => Lifecycle::Deleted { at },
      (is_deleted, deleted_at) => {
        return Err(StoreError::Storage(format!(
          "audio record {} has inconsistent deletion columns (is_deleted={}, deleted_at={:?})",
          row.id, is_deleted, deleted_at
        )));
      }
    };

    Ok(AudioRecord {
      id: row.id,
      user_id: row.user_id,
      filename: row.filename,
      display_name: row.display_name,
      category: row.category,
      voice: row.voice,
      speed: row.speed,
      character_count: row.character_count,
      cost: row.cost,
      text_preview: row.text_preview,
      created_at: row.created_at,
      state,
    })
  }
}

/// All-time totals for one user.
#[derive(Debug, Clone, Default, FromRow)]
pub struct UsageTotals {
  pub total_characters: i64,
  pub total_cost: f64,
  pub files_generated: i64,
}

/// One calendar month's share of a user's usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyUsage {
  pub characters: i64,
  pub cost: f64,
  pub files: i64,
}

#[derive(Debug, Clone)]
pub struct UsageStats {
  pub user_id: i64,
  pub total_characters: i64,
  pub total_cost: f64,
  pub files_generated: i64,
  pub monthly: BTreeMap<String, MonthlyUsage>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlaybackEntry {
  pub id: i64,
  pub user_id: i64,
  pub audio_id: i64,
  pub played_at: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lifecycle_mapping() {
    let mut row = AudioRecordRow {
      id: 1,
      user_id: 1,
      filename: "a.mp3".to_string(),
      display_name: "A".to_string(),
      category: "Uncategorized".to_string(),
      voice: "alloy".to_string(),
      speed: 1.0,
      character_count: 10,
      cost: 0.0001,
      text_preview: "hello".to_string(),
      created_at: 1000,
      is_deleted: false,
      deleted_at: None,
    };

    let record = AudioRecord::try_from(row.clone()).unwrap();
    assert_eq!(record.state, Lifecycle::Active);
    assert!(!record.state.is_deleted());
    assert_eq!(record.state.deleted_at(), None);

    row.is_deleted = true;
    row.deleted_at = Some(2000);
    let record = AudioRecord::try_from(row.clone()).unwrap();
    assert_eq!(record.state, Lifecycle::Deleted { at: 2000 });
    assert_eq!(record.state.deleted_at(), Some(2000));

    // A flagged row without a timestamp is corrupt, not Active
    row.deleted_at = None;
    assert!(AudioRecord::try_from(row).is_err());
  }
}
