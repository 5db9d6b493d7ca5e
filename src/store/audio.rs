use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::FromRow;

use crate::db::models::{AudioRecord, AudioRecordRow};
use crate::db::DbPool;
use crate::error::StoreError;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

const AUDIO_COLUMNS: &str = "id, user_id, filename, display_name, category, voice, speed, character_count, cost, text_preview, created_at, is_deleted, deleted_at";

/// Lifecycle of audio-artifact metadata: create, list, search, group,
/// soft-delete, restore, update.
pub struct AudioRecordStore {
    pool: DbPool,
}

/// Fields fixed at creation time.
#[derive(Debug, Clone)]
pub struct NewAudioRecord {
    pub user_id: i64,
    pub filename: String,
    pub display_name: String,
    pub voice: String,
    pub speed: f64,
    pub category: Option<String>,
    pub text_preview: String,
    pub character_count: i64,
    pub cost: f64,
}

/// The only two fields that stay mutable after creation. Everything else
/// (owner, voice, cost, ...) has no update path at all.
#[derive(Debug, Clone, Default)]
pub struct UpdateAudioRecord {
    pub display_name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, FromRow)]
struct GroupCount {
    category: String,
    count: i64,
}

impl AudioRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a new record in the Active state and return its id.
    pub async fn create(&self, new: &NewAudioRecord) -> Result<i64, StoreError> {
        let category = match new.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => DEFAULT_CATEGORY,
        };
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO audio_records
                (user_id, filename, display_name, category, voice, speed, character_count, cost, text_preview, created_at, is_deleted, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL)
            "#,
        )
        .bind(new.user_id)
        .bind(&new.filename)
        .bind(&new.display_name)
        .bind(category)
        .bind(&new.voice)
        .bind(new.speed)
        .bind(new.character_count)
        .bind(new.cost)
        .bind(&new.text_preview)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(
            "Stored audio record {} for user {} ({} chars, voice {})",
            id,
            new.user_id,
            new.character_count,
            new.voice
        );

        Ok(id)
    }

    /// All non-deleted records for the owner, newest first.
    pub async fn get_by_owner(&self, user_id: i64) -> Result<Vec<AudioRecord>, StoreError> {
        let rows: Vec<AudioRecordRow> = sqlx::query_as(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records WHERE user_id = ? AND is_deleted = 0 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AudioRecord::try_from).collect()
    }

    /// get_by_owner narrowed to one category (exact match).
    pub async fn get_by_group(
        &self,
        user_id: i64,
        group: &str,
    ) -> Result<Vec<AudioRecord>, StoreError> {
        let rows: Vec<AudioRecordRow> = sqlx::query_as(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records WHERE user_id = ? AND category = ? AND is_deleted = 0 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AudioRecord::try_from).collect()
    }

    /// Case-insensitive substring match on display_name among the owner's
    /// non-deleted records.
    pub async fn search(&self, user_id: i64, query: &str) -> Result<Vec<AudioRecord>, StoreError> {
        // Escape LIKE wildcards so the query is a literal substring
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );

        let rows: Vec<AudioRecordRow> = sqlx::query_as(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records WHERE user_id = ? AND is_deleted = 0 AND display_name LIKE ? ESCAPE '\\' ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AudioRecord::try_from).collect()
    }

    /// Count of non-deleted records per category. The counts sum to
    /// `get_by_owner(user_id).len()`.
    pub async fn get_groups(&self, user_id: i64) -> Result<BTreeMap<String, i64>, StoreError> {
        let rows: Vec<GroupCount> = sqlx::query_as(
            "SELECT category, COUNT(*) AS count FROM audio_records WHERE user_id = ? AND is_deleted = 0 GROUP BY category",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|g| (g.category, g.count)).collect())
    }

    /// Active -> Deleted. A second call is a no-op and leaves deleted_at alone.
    pub async fn soft_delete(&self, id: i64) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE audio_records SET is_deleted = 1, deleted_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Already deleted is fine; a missing row is not
            self.require_exists(id).await?;
            return Ok(());
        }

        tracing::info!("Soft-deleted audio record {}", id);
        Ok(())
    }

    /// Deleted -> Active. A second call is a no-op.
    pub async fn restore(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE audio_records SET is_deleted = 0, deleted_at = NULL WHERE id = ? AND is_deleted = 1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.require_exists(id).await?;
            return Ok(());
        }

        tracing::info!("Restored audio record {}", id);
        Ok(())
    }

    pub async fn update(&self, id: i64, update: &UpdateAudioRecord) -> Result<(), StoreError> {
        if let Some(name) = update.display_name.as_deref() {
            if name.trim().is_empty() {
                return Err(StoreError::Validation(
                    "display_name cannot be empty".to_string(),
                ));
            }
        }

        // An empty category falls back to the default, same as on create
        let category = update.category.as_deref().map(|c| {
            if c.trim().is_empty() {
                DEFAULT_CATEGORY
            } else {
                c
            }
        });

        let result = sqlx::query(
            r#"
            UPDATE audio_records SET
                display_name = COALESCE(?, display_name),
                category = COALESCE(?, category)
            WHERE id = ?
            "#,
        )
        .bind(update.display_name.as_deref())
        .bind(category)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("audio record {}", id)));
        }

        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<AudioRecord>, StoreError> {
        let row: Option<AudioRecordRow> = sqlx::query_as(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AudioRecord::try_from).transpose()
    }

    pub async fn get_by_filename(&self, filename: &str) -> Result<Option<AudioRecord>, StoreError> {
        let row: Option<AudioRecordRow> = sqlx::query_as(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records WHERE filename = ?"
        ))
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AudioRecord::try_from).transpose()
    }

    /// The owner's soft-deleted records, most recently deleted first.
    pub async fn get_deleted(&self, user_id: i64) -> Result<Vec<AudioRecord>, StoreError> {
        let rows: Vec<AudioRecordRow> = sqlx::query_as(&format!(
            "SELECT {AUDIO_COLUMNS} FROM audio_records WHERE user_id = ? AND is_deleted = 1 ORDER BY deleted_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AudioRecord::try_from).collect()
    }

    async fn require_exists(&self, id: i64) -> Result<(), StoreError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM audio_records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(StoreError::NotFound(format!("audio record {}", id)));
        }

        Ok(())
    }
}
