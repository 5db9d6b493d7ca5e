use chrono::Utc;
use serde::Serialize;
use sqlx::FromRow;

use crate::db::models::{MonthlyUsage, UsageStats, UsageTotals};
use crate::db::DbPool;
use crate::error::StoreError;

/// Per-user running totals plus per-month buckets. Totals and the current
/// month's bucket always move together, inside one transaction.
pub struct UsageStatsAggregator {
    pool: DbPool,
}

/// Instance-wide counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalSummary {
    pub total_users: i64,
    pub total_files: i64,
    pub total_characters: i64,
    pub total_cost: f64,
}

#[derive(Debug, FromRow)]
struct MonthlyRow {
    month: String,
    characters: i64,
    cost: f64,
    files: i64,
}

fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

impl UsageStatsAggregator {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetch the user's stats, creating a zeroed row on first use. Two racing
    /// first calls both come back with the single row the primary key allows.
    pub async fn get_or_create(&self, user_id: i64) -> Result<UsageStats, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO usage_stats (user_id, total_characters, total_cost, files_generated) VALUES (?, 0, 0, 0) ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let totals: UsageTotals = sqlx::query_as(
            "SELECT total_characters, total_cost, files_generated FROM usage_stats WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let monthly_rows: Vec<MonthlyRow> = sqlx::query_as(
            "SELECT month, characters, cost, files FROM usage_monthly WHERE user_id = ? ORDER BY month",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let monthly = monthly_rows
            .into_iter()
            .map(|row| {
                (
                    row.month,
                    MonthlyUsage {
                        characters: row.characters,
                        cost: row.cost,
                        files: row.files,
                    },
                )
            })
            .collect();

        Ok(UsageStats {
            user_id,
            total_characters: totals.total_characters,
            total_cost: totals.total_cost,
            files_generated: totals.files_generated,
            monthly,
        })
    }

    /// Record one generated file: bump the all-time totals and the current
    /// month's bucket in a single transaction. The increments run inside the
    /// engine (`x = x + ?`), so concurrent calls cannot lose updates.
    pub async fn update_stats(
        &self,
        user_id: i64,
        characters: i64,
        cost: f64,
    ) -> Result<(), StoreError> {
        let month = current_month();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO usage_stats (user_id, total_characters, total_cost, files_generated)
            VALUES (?, ?, ?, 1)
            ON CONFLICT(user_id) DO UPDATE SET
                total_characters = total_characters + excluded.total_characters,
                total_cost = total_cost + excluded.total_cost,
                files_generated = files_generated + 1
            "#,
        )
        .bind(user_id)
        .bind(characters)
        .bind(cost)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO usage_monthly (user_id, month, characters, cost, files)
            VALUES (?, ?, ?, ?, 1)
            ON CONFLICT(user_id, month) DO UPDATE SET
                characters = characters + excluded.characters,
                cost = cost + excluded.cost,
                files = files + 1
            "#,
        )
        .bind(user_id)
        .bind(&month)
        .bind(characters)
        .bind(cost)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            "Usage for user {}: +{} chars, +{} cost ({})",
            user_id,
            characters,
            cost,
            month
        );

        Ok(())
    }

    /// Committed snapshot of the all-time totals. Zeros for a user with no
    /// stats row; nothing is created.
    pub async fn get_all_time_usage(&self, user_id: i64) -> Result<UsageTotals, StoreError> {
        let totals: Option<UsageTotals> = sqlx::query_as(
            "SELECT total_characters, total_cost, files_generated FROM usage_stats WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(totals.unwrap_or_default())
    }

    /// Counts across all users.
    pub async fn global_summary(&self) -> Result<GlobalSummary, StoreError> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let total_files: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audio_records WHERE is_deleted = 0")
                .fetch_one(&self.pool)
                .await?;

        let total_characters: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_characters), 0) FROM usage_stats")
                .fetch_one(&self.pool)
                .await?;

        let total_cost: f64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_cost), 0.0) FROM usage_stats")
                .fetch_one(&self.pool)
                .await?;

        Ok(GlobalSummary {
            total_users,
            total_files,
            total_characters,
            total_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn seed_users(pool: &crate::db::DbPool) {
        for id in [1_i64, 2] {
            sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, '', 0)")
                .bind(id)
                .bind(format!("user{id}"))
                .execute(pool)
                .await
                .unwrap();
        }
    }

    async fn aggregator() -> UsageStatsAggregator {
        let pool = create_test_pool().await.unwrap();
        seed_users(&pool).await;
        UsageStatsAggregator::new(pool)
    }

    #[tokio::test]
    async fn test_get_or_create_starts_zeroed() {
        let stats = aggregator().await;

        let usage = stats.get_or_create(1).await.unwrap();
        assert_eq!(usage.total_characters, 0);
        assert_eq!(usage.files_generated, 0);
        assert!(usage.monthly.is_empty());

        // Second call reads the same row instead of failing
        let usage = stats.get_or_create(1).await.unwrap();
        assert_eq!(usage.total_characters, 0);
    }

    #[tokio::test]
    async fn test_update_stats_moves_totals_and_month_together() {
        let stats = aggregator().await;

        stats.update_stats(1, 100, 0.0015).await.unwrap();
        stats.update_stats(1, 100, 0.0015).await.unwrap();

        let usage = stats.get_or_create(1).await.unwrap();
        assert_eq!(usage.total_characters, 200);
        assert!((usage.total_cost - 0.003).abs() < 1e-9);
        assert_eq!(usage.files_generated, 2);

        let month = usage.monthly.get(&current_month()).unwrap();
        assert_eq!(month.characters, 200);
        assert!((month.cost - 0.003).abs() < 1e-9);
        assert_eq!(month.files, 2);

        // The month buckets always sum to the totals
        let bucket_sum: i64 = usage.monthly.values().map(|m| m.characters).sum();
        assert_eq!(bucket_sum, usage.total_characters);
    }

    #[tokio::test]
    async fn test_all_time_usage_snapshot() {
        let stats = aggregator().await;

        // No row yet: zeros, and still no row afterwards
        let totals = stats.get_all_time_usage(1).await.unwrap();
        assert_eq!(totals.total_characters, 0);

        stats.update_stats(1, 50, 0.0005).await.unwrap();
        let totals = stats.get_all_time_usage(1).await.unwrap();
        assert_eq!(totals.total_characters, 50);
        assert_eq!(totals.files_generated, 1);
    }

    #[tokio::test]
    async fn test_global_summary() {
        let pool = create_test_pool().await.unwrap();
        let users = crate::store::UserStore::with_cost(pool.clone(), 4);
        let audio = crate::store::AudioRecordStore::new(pool.clone());
        let stats = UsageStatsAggregator::new(pool);

        let empty = stats.global_summary().await.unwrap();
        assert_eq!(empty.total_users, 0);
        assert_eq!(empty.total_characters, 0);

        let alice = users.create_user("alice", "secret1", None).await.unwrap();
        audio
            .create(&crate::store::NewAudioRecord {
                user_id: alice.id,
                filename: "tts_1.mp3".to_string(),
                display_name: "First clip".to_string(),
                voice: "alloy".to_string(),
                speed: 1.0,
                category: None,
                text_preview: String::new(),
                character_count: 120,
                cost: 0.0018,
            })
            .await
            .unwrap();
        stats.update_stats(alice.id, 120, 0.0018).await.unwrap();

        let summary = stats.global_summary().await.unwrap();
        assert_eq!(summary.total_users, 1);
        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.total_characters, 120);
        assert!((summary.total_cost - 0.0018).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stats_are_per_user() {
        let stats = aggregator().await;

        stats.update_stats(1, 100, 0.001).await.unwrap();
        stats.update_stats(2, 30, 0.0003).await.unwrap();

        assert_eq!(stats.get_all_time_usage(1).await.unwrap().total_characters, 100);
        assert_eq!(stats.get_all_time_usage(2).await.unwrap().total_characters, 30);
    }
}
