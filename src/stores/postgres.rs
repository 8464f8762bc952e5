use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{NewToken, Token, TokenStatus, User, UserStatus};
use crate::stores::{TokenStore, UserStore};

const TOKEN_COLUMNS: &str = r#"id, user_id, name, key, status, created_time, accessed_time,
    expired_time, remain_quota, used_quota, unlimited_quota, model_limits_enabled,
    model_limits, allow_ips, "group""#;

const USER_COLUMNS: &str = "id, username, password_hash, status, created_at";

fn active_filter(must_be_active: bool) -> String {
    if must_be_active {
        format!(" AND status = {}", TokenStatus::Enabled.code())
    } else {
        String::new()
    }
}

/// Token store backed by the `tokens` table
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: NewToken) -> AppResult<Token> {
        let sql = format!(
            r#"
            INSERT INTO tokens (user_id, name, key, created_time, accessed_time, expired_time,
                remain_quota, unlimited_quota, model_limits_enabled, model_limits, allow_ips,
                "group")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        );

        let token = sqlx::query_as::<_, Token>(&sql)
            .bind(token.user_id)
            .bind(&token.name)
            .bind(&token.key)
            .bind(token.created_time)
            .bind(token.accessed_time)
            .bind(token.expired_time)
            .bind(token.remain_quota)
            .bind(token.unlimited_quota)
            .bind(token.model_limits_enabled)
            .bind(&token.model_limits)
            .bind(&token.allow_ips)
            .bind(&token.group)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Token key already exists".to_string())
                }
                _ => AppError::Database(e),
            })?;

        Ok(token)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Token>> {
        let sql = format!("SELECT {} FROM tokens WHERE id = $1", TOKEN_COLUMNS);

        let token = sqlx::query_as::<_, Token>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn get_by_key(&self, key: &str, must_be_active: bool) -> AppResult<Option<Token>> {
        let sql = format!(
            "SELECT {} FROM tokens WHERE key = $1{}",
            TOKEN_COLUMNS,
            active_filter(must_be_active)
        );

        let token = sqlx::query_as::<_, Token>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn set_remain_quota_by_id(&self, id: i32, quota: i64) -> AppResult<Option<Token>> {
        let sql = format!(
            "UPDATE tokens SET remain_quota = $1 WHERE id = $2 RETURNING {}",
            TOKEN_COLUMNS
        );

        let token = sqlx::query_as::<_, Token>(&sql)
            .bind(quota)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn set_remain_quota_by_key(
        &self,
        key: &str,
        quota: i64,
        must_be_active: bool,
    ) -> AppResult<Option<Token>> {
        let sql = format!(
            "UPDATE tokens SET remain_quota = $1 WHERE key = $2{} RETURNING {}",
            active_filter(must_be_active),
            TOKEN_COLUMNS
        );

        let token = sqlx::query_as::<_, Token>(&sql)
            .bind(quota)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn increase_remain_quota(
        &self,
        key: &str,
        delta: i64,
        must_be_active: bool,
    ) -> AppResult<Option<Token>> {
        // Single statement: the row lock taken by UPDATE serializes concurrent adds
        let sql = format!(
            "UPDATE tokens SET remain_quota = remain_quota + $1 WHERE key = $2{} RETURNING {}",
            active_filter(must_be_active),
            TOKEN_COLUMNS
        );

        let token = sqlx::query_as::<_, Token>(&sql)
            .bind(delta)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }
}

/// User store backed by the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a user by username
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<Option<User>> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(None);
        };

        if user.verify_password(password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn create_user(
        &self,
        username: &str,
        password: &str,
        status: UserStatus,
    ) -> AppResult<User> {
        let password_hash = User::hash_password(password)?;

        let sql = format!(
            r#"
            INSERT INTO users (username, password_hash, status)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(&password_hash)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Validation("Username already exists".to_string())
                }
                _ => AppError::Internal(format!("Failed to create user: {}", e)),
            })?;

        Ok(user)
    }

    async fn user_count(&self) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
