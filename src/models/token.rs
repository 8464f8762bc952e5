use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a token
///
/// Stored as an integer column. Only read by this service; other components
/// flip tokens to expired or exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i32)]
pub enum TokenStatus {
    Enabled = 1,
    Disabled = 2,
    Expired = 3,
    Exhausted = 4,
}

impl TokenStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Token model - one API key with its quota state
#[derive(Debug, Clone, FromRow)]
pub struct Token {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub key: String,
    pub status: TokenStatus,
    pub created_time: i64,
    pub accessed_time: i64,
    pub expired_time: i64,
    pub remain_quota: i64,
    pub used_quota: i64,
    pub unlimited_quota: bool,
    pub model_limits_enabled: bool,
    pub model_limits: String,
    pub allow_ips: Option<String>,
    pub group: String,
}

/// Values for a token about to be inserted
///
/// The store assigns `id`; `used_quota` starts at zero.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub user_id: i32,
    pub name: String,
    pub key: String,
    pub created_time: i64,
    pub accessed_time: i64,
    pub expired_time: i64,
    pub remain_quota: i64,
    pub unlimited_quota: bool,
    pub model_limits_enabled: bool,
    pub model_limits: String,
    pub allow_ips: Option<String>,
    pub group: String,
}

impl NewToken {
    /// Materialize the row as the store would return it
    pub fn into_token(self, id: i32) -> Token {
        Token {
            id,
            user_id: self.user_id,
            name: self.name,
            key: self.key,
            status: TokenStatus::Enabled,
            created_time: self.created_time,
            accessed_time: self.accessed_time,
            expired_time: self.expired_time,
            remain_quota: self.remain_quota,
            used_quota: 0,
            unlimited_quota: self.unlimited_quota,
            model_limits_enabled: self.model_limits_enabled,
            model_limits: self.model_limits,
            allow_ips: self.allow_ips,
            group: self.group,
        }
    }
}

/// DTO for creating a token with username/password credentials
///
/// Missing fields deserialize to their zero value and are replaced by the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTokenRequest {
    pub username: String,
    pub password: String,
    pub token_name: String,
    pub remain_quota: i64,
    pub expired_time: i64,
    pub group: String,
}

/// DTO for overwriting the quota of a token located by id
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTokenQuotaRequest {
    pub token_id: i32,
    pub remain_quota: i64,
}

/// DTO for overwriting the quota of a token located by key
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTokenQuotaByKeyRequest {
    pub api_key: String,
    pub remain_quota: i64,
}

/// DTO for adding quota to a token located by key
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddTokenQuotaRequest {
    pub api_key: String,
    pub add_quota: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenInfoRequest {
    pub api_key: String,
}

/// Response data for a created token (the only time the key is shown)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCreatedData {
    pub token_id: i32,
    pub key: String,
    pub user_id: i32,
}

/// Read-only projection of a token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfoData {
    pub token_id: i32,
    pub name: String,
    pub remain_quota: i64,
    pub used_quota: i64,
    pub created_time: i64,
    pub expired_time: i64,
    pub group: String,
    pub status: i32,
}

impl Token {
    pub fn to_created_data(&self) -> TokenCreatedData {
        TokenCreatedData {
            token_id: self.id,
            key: self.key.clone(),
            user_id: self.user_id,
        }
    }

    pub fn to_info(&self) -> TokenInfoData {
        TokenInfoData {
            token_id: self.id,
            name: self.name.clone(),
            remain_quota: self.remain_quota,
            used_quota: self.used_quota,
            created_time: self.created_time,
            expired_time: self.expired_time,
            group: self.group.clone(),
            status: self.status.code(),
        }
    }
}
