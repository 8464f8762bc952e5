//! Caller authorization for quota mutation.
//!
//! Creating a token authenticates with username/password, but the quota
//! update endpoints identify a token by id or key only. Who may call them is
//! decided by a [`QuotaAuthorizer`] injected into the service.

use subtle::ConstantTimeEq;

use crate::error::{AppError, AppResult};

/// Decides whether a caller may change token quotas
pub trait QuotaAuthorizer: Send + Sync {
    /// `credential` is the bearer token presented by the caller, if any
    fn authorize(&self, credential: Option<&str>) -> AppResult<()>;
}

/// Admits every caller
///
/// For deployments where only trusted internal services can reach the quota
/// endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustedCaller;

impl QuotaAuthorizer for TrustedCaller {
    fn authorize(&self, _credential: Option<&str>) -> AppResult<()> {
        Ok(())
    }
}

/// Requires the caller to present a shared secret as a bearer token
pub struct SharedSecretAuthorizer {
    secret: String,
}

impl SharedSecretAuthorizer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for SharedSecretAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretAuthorizer")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl QuotaAuthorizer for SharedSecretAuthorizer {
    fn authorize(&self, credential: Option<&str>) -> AppResult<()> {
        let credential = credential.ok_or_else(|| {
            AppError::Unauthorized("Missing Authorization header".to_string())
        })?;

        if bool::from(self.secret.as_bytes().ct_eq(credential.as_bytes())) {
            Ok(())
        } else {
            log::warn!("Rejected quota update with invalid admin token");
            Err(AppError::Forbidden(
                "Not allowed to modify token quota".to_string(),
            ))
        }
    }
}
