use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub quota: QuotaDefaults,
    pub security: SecurityConfig,
}

/// Database connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

/// Values substituted when a token creation request leaves a field unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDefaults {
    /// Name used when `token_name` is empty
    pub token_name: String,
    /// Quota used when `remain_quota` is zero or negative
    pub remain_quota: i64,
    /// Expiry used when `expired_time` is zero. `-1` means never expires.
    pub expired_time: i64,
    /// Group used when `group` is empty
    pub group: String,
    /// Longest accepted token name, in characters
    pub max_name_length: usize,
}

/// Security configuration for the quota mutation endpoints
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    /// Shared secret required as `Authorization: Bearer <secret>` on quota
    /// updates. When unset, quota updates are accepted from any caller.
    pub quota_admin_token: Option<String>,
}

pub const NEVER_EXPIRES: i64 = -1;

impl Default for QuotaDefaults {
    fn default() -> Self {
        Self {
            token_name: "Auto-generated token".to_string(),
            remain_quota: 100_000,
            expired_time: NEVER_EXPIRES,
            group: "default".to_string(),
            max_name_length: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            database: DatabaseConfig::from_env()?,
            quota: QuotaDefaults::from_env()?,
            security: SecurityConfig::from_env(),
        })
    }
}

impl QuotaDefaults {
    /// Load token defaults from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let fallback = Self::default();

        let defaults = Self {
            token_name: env::var("DEFAULT_TOKEN_NAME")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback.token_name),
            remain_quota: env::var("DEFAULT_REMAIN_QUOTA")
                .unwrap_or_else(|_| fallback.remain_quota.to_string())
                .parse()
                .unwrap_or(fallback.remain_quota),
            expired_time: env::var("DEFAULT_EXPIRED_TIME")
                .unwrap_or_else(|_| fallback.expired_time.to_string())
                .parse()
                .unwrap_or(fallback.expired_time),
            group: env::var("DEFAULT_TOKEN_GROUP")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback.group),
            max_name_length: env::var("MAX_TOKEN_NAME_LENGTH")
                .unwrap_or_else(|_| fallback.max_name_length.to_string())
                .parse()
                .unwrap_or(fallback.max_name_length),
        };

        // A non-positive default would defeat the `remain_quota <= 0` substitution
        if defaults.remain_quota <= 0 {
            return Err(ConfigError::InvalidDefaultQuota);
        }
        if defaults.token_name.chars().count() > defaults.max_name_length {
            return Err(ConfigError::DefaultTokenNameTooLong);
        }

        Ok(defaults)
    }
}

impl DatabaseConfig {
    /// Pool settings for `url` with the default sizing and timeouts
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    /// Load database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;
        let fallback = Self::for_url(url);

        Ok(Self {
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", fallback.max_connections),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", fallback.min_connections),
            acquire_timeout: env_secs_or("DATABASE_ACQUIRE_TIMEOUT_SECS", fallback.acquire_timeout),
            idle_timeout: env_secs_or("DATABASE_IDLE_TIMEOUT_SECS", fallback.idle_timeout),
            max_lifetime: env_secs_or("DATABASE_MAX_LIFETIME_SECS", fallback.max_lifetime),
            ..fallback
        })
    }
}

fn env_or<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

fn env_secs_or(name: &str, fallback: Duration) -> Duration {
    Duration::from_secs(env_or(name, fallback.as_secs()))
}

impl SecurityConfig {
    /// Load security configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            quota_admin_token: env::var("QUOTA_ADMIN_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    MissingDatabaseUrl,
    InvalidDefaultQuota,
    DefaultTokenNameTooLong,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL environment variable is required")
            }
            ConfigError::InvalidDefaultQuota => {
                write!(f, "DEFAULT_REMAIN_QUOTA must be greater than 0")
            }
            ConfigError::DefaultTokenNameTooLong => {
                write!(f, "DEFAULT_TOKEN_NAME must not exceed MAX_TOKEN_NAME_LENGTH")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
