//! Wiring of stores, collaborators and routes.

use actix_web::web;
use std::sync::Arc;

use crate::auth::{QuotaAuthorizer, RandomKeyGenerator, SharedSecretAuthorizer, TrustedCaller};
use crate::config::{Config, SecurityConfig};
use crate::db::DbPool;
use crate::routes;
use crate::services::TokenQuotaService;
use crate::stores::{PgTokenStore, PgUserStore};

/// Picks the quota authorizer for the configured security mode
pub fn quota_authorizer(security: &SecurityConfig) -> Arc<dyn QuotaAuthorizer> {
    match &security.quota_admin_token {
        Some(secret) => Arc::new(SharedSecretAuthorizer::new(secret.clone())),
        None => {
            log::warn!(
                "QUOTA_ADMIN_TOKEN not set, quota update endpoints accept any caller"
            );
            Arc::new(TrustedCaller)
        }
    }
}

/// Builds the service on top of the Postgres stores
pub fn postgres_service(pool: DbPool, config: &Config) -> TokenQuotaService {
    TokenQuotaService::new(
        Arc::new(PgTokenStore::new(pool.clone())),
        Arc::new(PgUserStore::new(pool)),
        Arc::new(RandomKeyGenerator),
        quota_authorizer(&config.security),
        config.quota.clone(),
    )
}

/// Registers every route of the server
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(routes::health::configure)
        .configure(routes::tokens::configure);
}
