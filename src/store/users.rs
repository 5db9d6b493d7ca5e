use sqlx::FromRow;

use crate::auth::{hash_password, verify_password};
use crate::db::models::User;
use crate::db::DbPool;
use crate::error::StoreError;

/// Account creation and authentication.
pub struct UserStore {
    pool: DbPool,
    bcrypt_cost: u32,
}

/// Row for the admin user listing, with a live artifact count.
#[derive(Debug, Clone, FromRow)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub created_at: i64,
    pub audio_count: i64,
}

impl UserStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Same store with a non-default bcrypt cost.
    pub fn with_cost(pool: DbPool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<User, StoreError> {
        validate_username(username)?;
        validate_password(password)?;

        // Case-sensitive exact match, same as the lookup in authenticate
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            return Err(StoreError::DuplicateUsername(username.to_string()));
        }

        let password_hash = hash_password(password, self.bcrypt_cost)
            .map_err(|e| StoreError::Storage(format!("password hashing failed: {}", e)))?;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, email, is_admin, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Two creations can race past the pre-check; the unique index on
            // username decides the winner
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                StoreError::DuplicateUsername(username.to_string())
            } else {
                StoreError::Storage(e.to_string())
            }
        })?;

        let id = result.last_insert_rowid();
        tracing::info!("Created user {} (id: {})", username, id);

        Ok(User {
            id,
            username: username.to_string(),
            password_hash,
            email: email.map(str::to_string),
            is_admin: false,
            created_at: now,
        })
    }

    /// Check credentials. Returns `None` for an unknown username and for a
    /// wrong password alike; the caller cannot tell which one failed.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(None);
        };

        let matches = verify_password(password, &user.password_hash)
            .map_err(|e| StoreError::Storage(format!("password verification failed: {}", e)))?;

        Ok(if matches { Some(user) } else { None })
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email, is_admin, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, email, is_admin, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn set_admin(&self, id: i64, is_admin: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
            .bind(is_admin)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }

        tracing::info!("Set is_admin={} for user {}", is_admin, id);
        Ok(())
    }

    /// All accounts with their non-deleted artifact counts, newest first.
    pub async fn list_users(&self) -> Result<Vec<UserListItem>, StoreError> {
        let users = sqlx::query_as::<_, UserListItem>(
            r#"
            SELECT
                u.id,
                u.username,
                u.is_admin,
                u.created_at,
                COUNT(a.id) AS audio_count
            FROM users u
            LEFT JOIN audio_records a ON u.id = a.user_id AND a.is_deleted = 0
            GROUP BY u.id, u.username, u.is_admin, u.created_at
            ORDER BY u.created_at DESC, u.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

fn validate_username(username: &str) -> Result<(), StoreError> {
    if username.len() < 3 || username.len() > 80 {
        return Err(StoreError::Validation(
            "username must be between 3 and 80 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(StoreError::Validation(
            "username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), StoreError> {
    if password.len() < 6 || password.len() > 255 {
        return Err(StoreError::Validation(
            "password must be between 6 and 255 characters".to_string(),
        ));
    }

    Ok(())
}
