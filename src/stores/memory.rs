use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, AppResult};
use crate::models::{NewToken, Token, TokenStatus, User, UserStatus};
use crate::stores::{TokenStore, UserStore};

fn lock<T>(mutex: &Mutex<T>) -> AppResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))
}

#[derive(Default)]
struct TokenTable {
    next_id: i32,
    rows: BTreeMap<i32, Token>,
    ids_by_key: HashMap<String, i32>,
}

impl TokenTable {
    fn id_for_key(&self, key: &str, must_be_active: bool) -> Option<i32> {
        let id = self.ids_by_key.get(key).copied()?;
        let active = self
            .rows
            .get(&id)
            .is_some_and(|t| t.status == TokenStatus::Enabled);
        (active || !must_be_active).then_some(id)
    }

    fn update<F>(&mut self, id: Option<i32>, apply: F) -> AppResult<Option<Token>>
    where
        F: FnOnce(&mut Token) -> AppResult<()>,
    {
        let Some(token) = id.and_then(|id| self.rows.get_mut(&id)) else {
            return Ok(None);
        };
        apply(token)?;
        Ok(Some(token.clone()))
    }
}

/// Token store held in process memory
///
/// Every operation runs under a single lock, so quota increments never race.
#[derive(Default)]
pub struct MemoryTokenStore {
    table: Mutex<TokenTable>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flips the status of an existing token
    pub fn set_status(&self, token_id: i32, status: TokenStatus) -> AppResult<()> {
        let mut table = lock(&self.table)?;
        let token = table
            .rows
            .get_mut(&token_id)
            .ok_or_else(|| AppError::NotFound(format!("Token with id {} not found", token_id)))?;
        token.status = status;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: NewToken) -> AppResult<Token> {
        let mut table = lock(&self.table)?;

        if table.ids_by_key.contains_key(&token.key) {
            return Err(AppError::Conflict("Token key already exists".to_string()));
        }

        table.next_id += 1;
        let id = table.next_id;
        let token = token.into_token(id);
        table.ids_by_key.insert(token.key.clone(), id);
        table.rows.insert(id, token.clone());

        Ok(token)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Token>> {
        Ok(lock(&self.table)?.rows.get(&id).cloned())
    }

    async fn get_by_key(&self, key: &str, must_be_active: bool) -> AppResult<Option<Token>> {
        let table = lock(&self.table)?;
        Ok(table
            .id_for_key(key, must_be_active)
            .and_then(|id| table.rows.get(&id).cloned()))
    }

    async fn set_remain_quota_by_id(&self, id: i32, quota: i64) -> AppResult<Option<Token>> {
        lock(&self.table)?.update(Some(id), |token| {
            token.remain_quota = quota;
            Ok(())
        })
    }

    async fn set_remain_quota_by_key(
        &self,
        key: &str,
        quota: i64,
        must_be_active: bool,
    ) -> AppResult<Option<Token>> {
        let mut table = lock(&self.table)?;
        let id = table.id_for_key(key, must_be_active);
        table.update(id, |token| {
            token.remain_quota = quota;
            Ok(())
        })
    }

    async fn increase_remain_quota(
        &self,
        key: &str,
        delta: i64,
        must_be_active: bool,
    ) -> AppResult<Option<Token>> {
        let mut table = lock(&self.table)?;
        let id = table.id_for_key(key, must_be_active);
        table.update(id, |token| {
            token.remain_quota = token
                .remain_quota
                .checked_add(delta)
                .ok_or_else(|| AppError::Internal("Token quota overflow".to_string()))?;
            Ok(())
        })
    }
}

/// User store held in process memory
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the status of an existing user
    pub fn set_status(&self, user_id: i32, status: UserStatus) -> AppResult<()> {
        let mut users = lock(&self.users)?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        user.status = status;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<Option<User>> {
        let user = lock(&self.users)?
            .iter()
            .find(|u| u.username == username)
            .cloned();

        match user {
            Some(user) if user.verify_password(password)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    async fn create_user(
        &self,
        username: &str,
        password: &str,
        status: UserStatus,
    ) -> AppResult<User> {
        let password_hash = User::hash_password(password)?;
        let mut users = lock(&self.users)?;

        if users.iter().any(|u| u.username == username) {
            return Err(AppError::Validation("Username already exists".to_string()));
        }

        let user = User {
            id: users.len() as i32 + 1,
            username: username.to_string(),
            password_hash,
            status,
            created_at: Utc::now(),
        };
        users.push(user.clone());

        Ok(user)
    }

    async fn user_count(&self) -> AppResult<i64> {
        Ok(lock(&self.users)?.len() as i64)
    }
}
