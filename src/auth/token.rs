use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::{AppError, AppResult};

/// Length of a generated API key
pub const KEY_LENGTH: usize = 48;

/// Prefix clients conventionally put in front of the key
pub const KEY_PREFIX: &str = "sk-";

const KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of the charset size that fits in a byte; higher bytes are
// rejected so every character is equally likely.
const ACCEPT_BELOW: u8 = (256 / KEY_CHARSET.len() * KEY_CHARSET.len()) as u8;

/// Source of new secret keys
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> AppResult<String>;
}

/// Generates keys from the operating system RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> AppResult<String> {
        let mut key = String::with_capacity(KEY_LENGTH);
        let mut buf = [0u8; KEY_LENGTH];

        while key.len() < KEY_LENGTH {
            OsRng
                .try_fill_bytes(&mut buf)
                .map_err(|e| AppError::Internal(format!("Failed to generate API key: {}", e)))?;

            for byte in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
                if key.len() == KEY_LENGTH {
                    break;
                }
                key.push(KEY_CHARSET[byte as usize % KEY_CHARSET.len()] as char);
            }
        }

        Ok(key)
    }
}

/// Validates key format (48 ASCII alphanumeric chars)
pub fn is_valid_key_format(key: &str) -> bool {
    key.len() == KEY_LENGTH && key.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Trims a caller-supplied key and strips the optional `sk-` prefix
pub fn normalize_key(raw: &str) -> &str {
    let key = raw.trim();
    key.strip_prefix(KEY_PREFIX).unwrap_or(key)
}
