use chrono::Utc;
use sqlx::FromRow;

use crate::db::models::PlaybackEntry;
use crate::db::DbPool;
use crate::error::StoreError;

use crate::views::PlaybackHistoryView;

/// Shown when a play entry points at an artifact that is soft-deleted or gone.
const MISSING_AUDIO_NAME: &str = "Deleted audio";

const MAX_RECENT: i64 = 100;

/// Append-only log of play events.
pub struct PlaybackHistoryStore {
    pool: DbPool,
}

#[derive(Debug, FromRow)]
struct HistoryJoinRow {
    audio_id: i64,
    played_at: i64,
    audio_name: Option<String>,
}

impl PlaybackHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a play event. The audio record is not checked: history is
    /// allowed to reference deleted artifacts.
    pub async fn add_playback(
        &self,
        user_id: i64,
        audio_id: i64,
    ) -> Result<PlaybackEntry, StoreError> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO playback_history (user_id, audio_id, played_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(audio_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(PlaybackEntry {
            id: result.last_insert_rowid(),
            user_id,
            audio_id,
            played_at: now,
        })
    }

    /// The user's latest plays, newest first. `limit` is capped at 100.
    pub async fn get_recent(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<PlaybackEntry>, StoreError> {
        let limit = limit.max(0).min(MAX_RECENT);

        let entries = sqlx::query_as::<_, PlaybackEntry>(
            "SELECT id, user_id, audio_id, played_at FROM playback_history WHERE user_id = ? ORDER BY played_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// get_recent with artifact names resolved for display. The name comes
    /// from a join at query time; deleted or missing artifacts fall back to a
    /// placeholder instead of failing.
    pub async fn get_recent_views(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<PlaybackHistoryView>, StoreError> {
        let limit = limit.max(0).min(MAX_RECENT);

        let rows: Vec<HistoryJoinRow> = sqlx::query_as(
            r#"
            SELECT h.audio_id, h.played_at, a.display_name AS audio_name
            FROM playback_history h
            LEFT JOIN audio_records a ON a.id = h.audio_id AND a.is_deleted = 0
            WHERE h.user_id = ?
            ORDER BY h.played_at DESC, h.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PlaybackHistoryView {
                audio_id: row.audio_id,
                audio_name: row
                    .audio_name
                    .unwrap_or_else(|| MISSING_AUDIO_NAME.to_string()),
                played_at: row.played_at,
            })
            .collect())
    }

    /// Drop every entry for the user. Returns how many were removed.
    pub async fn clear_user_history(&self, user_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM playback_history WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Cleared {} playback entries for user {}",
            result.rows_affected(),
            user_id
        );

        Ok(result.rows_affected())
    }
}
