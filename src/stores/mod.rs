//! Persistence and credential collaborators of the token quota service.
//!
//! The service only talks to these traits. [`postgres`] backs them with the
//! database; [`memory`] keeps everything in process.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{NewToken, Token, User, UserStatus};

pub use memory::{MemoryTokenStore, MemoryUserStore};
pub use postgres::{PgTokenStore, PgUserStore};

/// Source of user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user whose username and password both match
    async fn validate_credentials(&self, username: &str, password: &str)
        -> AppResult<Option<User>>;

    /// Creates a user, hashing the password
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        status: UserStatus,
    ) -> AppResult<User>;

    async fn user_count(&self) -> AppResult<i64>;
}

/// Storage of token records
///
/// Quota writes return the updated token, or `None` when no token matched.
/// Key-based methods take `must_be_active`; when set, only tokens with
/// [`TokenStatus::Enabled`](crate::models::TokenStatus::Enabled) match.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts a token; fails with `Conflict` if the key is already taken
    async fn insert(&self, token: NewToken) -> AppResult<Token>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Token>>;

    async fn get_by_key(&self, key: &str, must_be_active: bool) -> AppResult<Option<Token>>;

    /// Overwrites `remain_quota`
    async fn set_remain_quota_by_id(&self, id: i32, quota: i64) -> AppResult<Option<Token>>;

    /// Overwrites `remain_quota`
    async fn set_remain_quota_by_key(
        &self,
        key: &str,
        quota: i64,
        must_be_active: bool,
    ) -> AppResult<Option<Token>>;

    /// Adds `delta` to `remain_quota` as one atomic step
    ///
    /// Concurrent calls on the same key must all be reflected exactly once.
    async fn increase_remain_quota(
        &self,
        key: &str,
        delta: i64,
        must_be_active: bool,
    ) -> AppResult<Option<Token>>;
}
