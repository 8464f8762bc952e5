use log::{info, warn};
use std::env;

use crate::error::{AppError, AppResult};
use crate::models::UserStatus;
use crate::stores::UserStore;

/// Bootstrap the initial user from CREATE_ROOT_USER env var
/// Format: "username:password"
/// Only creates user if no users exist
pub async fn create_root_user_if_needed(users: &dyn UserStore) -> AppResult<()> {
    let create_root_user = match env::var("CREATE_ROOT_USER") {
        Ok(val) if !val.is_empty() => val,
        _ => {
            info!("CREATE_ROOT_USER not set, skipping root user creation");
            return Ok(());
        }
    };

    if users.user_count().await? > 0 {
        warn!("CREATE_ROOT_USER set but users already exist. Skipping root user creation.");
        return Ok(());
    }

    let (username, password) = parse_root_user(&create_root_user)?;

    users
        .create_user(username, password, UserStatus::Enabled)
        .await?;
    info!("Root user created: {}", username);

    Ok(())
}

/// Splits "username:password", trimming the username
pub fn parse_root_user(value: &str) -> AppResult<(&str, &str)> {
    let (username, password) = value.split_once(':').ok_or_else(|| {
        AppError::Validation("CREATE_ROOT_USER must be in format 'username:password'".to_string())
    })?;

    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    Ok((username, password))
}
