//! Serialized shapes handed to the web layer. The store models stay internal;
//! these are the only projections that cross the boundary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::models::{AudioRecord, MonthlyUsage, UsageStats, User};

/// User as exposed to callers. The password digest never leaves the store layer.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
  pub id: i64,
  pub username: String,
  pub email: Option<String>,
  pub is_admin: bool,
}

impl From<&User> for UserView {
  fn from(u: &User) -> Self {
    Self {
      id: u.id,
      username: u.username.clone(),
      email: u.email.clone(),
      is_admin: u.is_admin,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioRecordView {
  pub filename: String,
  pub display_name: String,
  pub category: String,
  pub voice: String,
  pub speed: f64,
  pub characters: i64,
  pub cost: f64,
  pub created_at: i64,
  pub is_deleted: bool,
  /// Only populated on direct single-record fetches, never in list views.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub text_preview: Option<String>,
}

impl AudioRecordView {
  pub fn from_record(r: &AudioRecord) -> Self {
    Self {
      filename: r.filename.clone(),
      display_name: r.display_name.clone(),
      category: r.category.clone(),
      voice: r.voice.clone(),
      speed: r.speed,
      characters: r.character_count,
      cost: r.cost,
      created_at: r.created_at,
      is_deleted: r.state.is_deleted(),
      text_preview: None,
    }
  }

  pub fn with_preview(r: &AudioRecord) -> Self {
    Self {
      text_preview: Some(r.text_preview.clone()),
      ..Self::from_record(r)
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStatsView {
  pub total_characters: i64,
  pub total_cost: f64,
  pub files_generated: i64,
  pub monthly: BTreeMap<String, MonthlyUsage>,
}

impl From<&UsageStats> for UsageStatsView {
  fn from(s: &UsageStats) -> Self {
    Self {
      total_characters: s.total_characters,
      total_cost: s.total_cost,
      files_generated: s.files_generated,
      monthly: s.monthly.clone(),
    }
  }
}

/// One play event with the artifact name resolved at query time.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackHistoryView {
  pub audio_id: i64,
  pub audio_name: String,
  pub played_at: i64,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::models::Lifecycle;

  fn record() -> AudioRecord {
    AudioRecord {
      id: 7,
      user_id: 1,
      filename: "tts_7.mp3".to_string(),
      display_name: "Greeting".to_string(),
      category: "Uncategorized".to_string(),
      voice: "alloy".to_string(),
      speed: 1.0,
      character_count: 42,
      cost: 0.00063,
      text_preview: "Hello there".to_string(),
      created_at: 1700000000,
      state: Lifecycle::Active,
    }
  }

  #[test]
  fn test_list_view_omits_preview() {
    let json = serde_json::to_value(AudioRecordView::from_record(&record())).unwrap();
    assert!(json.get("text_preview").is_none());
    assert_eq!(json["characters"], 42);
    assert_eq!(json["is_deleted"], false);
  }

  #[test]
  fn test_detail_view_carries_preview() {
    let json = serde_json::to_value(AudioRecordView::with_preview(&record())).unwrap();
    assert_eq!(json["text_preview"], "Hello there");
  }

  #[test]
  fn test_user_view_has_no_digest() {
    let user = User {
      id: 1,
      username: "alice".to_string(),
      password_hash: "$2b$04$secret".to_string(),
      email: None,
      is_admin: false,
      created_at: 1700000000,
    };
    let json = serde_json::to_string(&UserView::from(&user)).unwrap();
    assert!(!json.contains("secret"));
    assert!(!json.contains("password"));
  }
}
