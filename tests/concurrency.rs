//! Concurrency properties of the accounting layer, run against a file-backed
//! WAL database so writers genuinely contend.

use tempfile::TempDir;
use vocalog::db::create_pool;
use vocalog::store::UsageStatsAggregator;

async fn wal_pool(dir: &TempDir) -> vocalog::DbPool {
    let url = format!(
        "sqlite:{}?mode=rwc",
        dir.path().join("vocalog_test.db").display()
    );
    create_pool(&url, 5).await.unwrap()
}

async fn seed_user(pool: &vocalog::DbPool, id: i64) {
    sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, '', 0)")
        .bind(id)
        .bind(format!("user{id}"))
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_update_stats_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let pool = wal_pool(&dir).await;
    seed_user(&pool, 1).await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let stats = UsageStatsAggregator::new(pool.clone());
        handles.push(tokio::spawn(
            async move { stats.update_stats(1, 10, 0.0001).await },
        ));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = UsageStatsAggregator::new(pool);
    let totals = stats.get_all_time_usage(1).await.unwrap();
    assert_eq!(totals.total_characters, 500);
    assert_eq!(totals.files_generated, 50);
    assert!((totals.total_cost - 0.005).abs() < 1e-9);

    // The month buckets kept pace with the totals
    let usage = stats.get_or_create(1).await.unwrap();
    let bucket_chars: i64 = usage.monthly.values().map(|m| m.characters).sum();
    let bucket_files: i64 = usage.monthly.values().map(|m| m.files).sum();
    assert_eq!(bucket_chars, 500);
    assert_eq!(bucket_files, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_get_or_create_first_use_race() {
    let dir = TempDir::new().unwrap();
    let pool = wal_pool(&dir).await;
    seed_user(&pool, 7).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let stats = UsageStatsAggregator::new(pool.clone());
        handles.push(tokio::spawn(async move { stats.get_or_create(7).await }));
    }

    // Every racer observes the one row the primary key allows
    for handle in handles {
        let usage = handle.await.unwrap().unwrap();
        assert_eq!(usage.user_id, 7);
        assert_eq!(usage.total_characters, 0);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_stats WHERE user_id = 7")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
