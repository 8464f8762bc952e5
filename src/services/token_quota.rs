use chrono::Utc;
use std::sync::Arc;

use crate::auth::{is_valid_key_format, normalize_key, KeyGenerator, QuotaAuthorizer};
use crate::config::QuotaDefaults;
use crate::error::{AppError, AppResult};
use crate::models::{
    AddTokenQuotaRequest, CreateTokenRequest, NewToken, Token, TokenCreatedData, TokenInfoData,
    UpdateTokenQuotaByKeyRequest, UpdateTokenQuotaRequest,
};
use crate::stores::{TokenStore, UserStore};

/// Creates tokens and manages their remaining quota
///
/// Every collaborator is injected so deployments can swap persistence,
/// key generation, or caller authorization independently.
#[derive(Clone)]
pub struct TokenQuotaService {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
    keys: Arc<dyn KeyGenerator>,
    authorizer: Arc<dyn QuotaAuthorizer>,
    defaults: QuotaDefaults,
}

impl TokenQuotaService {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn UserStore>,
        keys: Arc<dyn KeyGenerator>,
        authorizer: Arc<dyn QuotaAuthorizer>,
        defaults: QuotaDefaults,
    ) -> Self {
        Self {
            tokens,
            users,
            keys,
            authorizer,
            defaults,
        }
    }

    /// Creates a token for the user identified by username and password
    pub async fn create_token(&self, req: CreateTokenRequest) -> AppResult<TokenCreatedData> {
        if req.username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        if req.password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }

        let name = non_empty_or(req.token_name, &self.defaults.token_name);
        let max_len = self.defaults.max_name_length;
        if name.chars().count() > max_len {
            return Err(AppError::Validation(format!(
                "Token name too long (max {} characters)",
                max_len
            )));
        }

        let group = non_empty_or(req.group, &self.defaults.group);
        let remain_quota = if req.remain_quota <= 0 {
            self.defaults.remain_quota
        } else {
            req.remain_quota
        };
        let expired_time = if req.expired_time == 0 {
            self.defaults.expired_time
        } else {
            req.expired_time
        };

        let user = self
            .users
            .validate_credentials(&req.username, &req.password)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

        if !user.is_enabled() {
            return Err(AppError::Forbidden("User account is disabled".to_string()));
        }

        let key = self.keys.generate().map_err(|e| {
            log::error!("Failed to generate token key: {}", e);
            e
        })?;
        if !is_valid_key_format(&key) {
            log::error!("Key generator produced a malformed key");
            return Err(AppError::Internal(
                "Failed to generate API key: malformed key".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let token = self
            .tokens
            .insert(NewToken {
                user_id: user.id,
                name,
                key,
                created_time: now,
                accessed_time: now,
                expired_time,
                remain_quota,
                unlimited_quota: false,
                model_limits_enabled: false,
                model_limits: String::new(),
                allow_ips: None,
                group,
            })
            .await
            .map_err(|e| {
                log::error!("Failed to create token for user {}: {}", user.id, e);
                AppError::Internal(format!("Failed to create token: {}", e))
            })?;

        log::info!("Created token {} for user {}", token.id, token.user_id);

        Ok(token.to_created_data())
    }

    /// Overwrites the remaining quota of the token with the given id
    pub async fn update_quota(
        &self,
        req: UpdateTokenQuotaRequest,
        credential: Option<&str>,
    ) -> AppResult<()> {
        if req.token_id <= 0 {
            return Err(AppError::Validation(
                "Invalid token_id: must be greater than 0".to_string(),
            ));
        }
        validate_remain_quota(req.remain_quota)?;

        self.authorizer.authorize(credential)?;

        self.tokens
            .set_remain_quota_by_id(req.token_id, req.remain_quota)
            .await
            .map_err(|e| persistence_error("update token quota", e))?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Token not found: no token with id {}",
                    req.token_id
                ))
            })?;

        Ok(())
    }

    /// Overwrites the remaining quota of the token with the given key
    pub async fn update_quota_by_key(
        &self,
        req: UpdateTokenQuotaByKeyRequest,
        credential: Option<&str>,
    ) -> AppResult<()> {
        let key = require_key(&req.api_key)?;
        validate_remain_quota(req.remain_quota)?;

        self.authorizer.authorize(credential)?;

        self.tokens
            .set_remain_quota_by_key(lookup_key(key)?, req.remain_quota, true)
            .await
            .map_err(|e| persistence_error("update token quota", e))?
            .ok_or_else(key_not_found)?;

        Ok(())
    }

    /// Adds to the remaining quota of the token with the given key
    ///
    /// Returns the quota after the addition.
    pub async fn add_quota(
        &self,
        req: AddTokenQuotaRequest,
        credential: Option<&str>,
    ) -> AppResult<i64> {
        let key = require_key(&req.api_key)?;
        if req.add_quota <= 0 {
            return Err(AppError::Validation(
                "Invalid add_quota: must be greater than 0".to_string(),
            ));
        }

        self.authorizer.authorize(credential)?;

        let token = self
            .tokens
            .increase_remain_quota(lookup_key(key)?, req.add_quota, true)
            .await
            .map_err(|e| persistence_error("add token quota", e))?
            .ok_or_else(key_not_found)?;

        Ok(token.remain_quota)
    }

    /// Returns the public projection of the token with the given key
    pub async fn get_token_info(&self, api_key: &str) -> AppResult<TokenInfoData> {
        let token = self.find_by_key(api_key).await?;
        Ok(token.to_info())
    }

    async fn find_by_key(&self, api_key: &str) -> AppResult<Token> {
        let key = require_key(api_key)?;
        self.tokens
            .get_by_key(lookup_key(key)?, true)
            .await?
            .ok_or_else(key_not_found)
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn require_key(raw: &str) -> AppResult<&str> {
    let key = normalize_key(raw);
    if key.is_empty() {
        return Err(AppError::Validation("API key is required".to_string()));
    }
    Ok(key)
}

// Every stored key came out of `create_token`, so other shapes cannot match
fn lookup_key(key: &str) -> AppResult<&str> {
    if !is_valid_key_format(key) {
        return Err(key_not_found());
    }
    Ok(key)
}

fn validate_remain_quota(quota: i64) -> AppResult<()> {
    if quota < 0 {
        return Err(AppError::Validation(
            "Invalid remain_quota: must be >= 0".to_string(),
        ));
    }
    Ok(())
}

fn key_not_found() -> AppError {
    AppError::NotFound("Token not found: no active token matches the given key".to_string())
}

fn persistence_error(action: &str, err: AppError) -> AppError {
    log::error!("Failed to {} ({}): {}", action, err.kind(), err);
    match err {
        AppError::Internal(_) => err,
        other => AppError::Internal(format!("Failed to {}: {}", action, other)),
    }
}
