pub mod health;
pub mod tokens;

use actix_web::web;

use crate::error::AppError;

/// JSON extractor settings shared by all API routes
///
/// Malformed bodies are answered with the standard failure envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            AppError::Validation(format!("Invalid request parameters: {}", err)).into()
        })
}
