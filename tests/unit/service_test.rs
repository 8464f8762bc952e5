//! Unit tests for the token quota service
//!
//! Runs every operation against in-memory stores.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::collections::HashSet;
use std::sync::Arc;

use token_quota::auth::{SharedSecretAuthorizer, KEY_LENGTH};
use token_quota::config::QuotaDefaults;
use token_quota::error::AppError;
use token_quota::models::{
    AddTokenQuotaRequest, CreateTokenRequest, TokenStatus, UpdateTokenQuotaByKeyRequest,
    UpdateTokenQuotaRequest, UserStatus,
};
use token_quota::stores::TokenStore;

use crate::common::fixtures::{PASSWORD, USERNAME};
use crate::common::{CreateTokenBuilder, FailingKeyGenerator, FixedKeyGenerator, TestContext};

fn add(api_key: &str, add_quota: i64) -> AddTokenQuotaRequest {
    AddTokenQuotaRequest {
        api_key: api_key.to_string(),
        add_quota,
    }
}

fn set_by_key(api_key: &str, remain_quota: i64) -> UpdateTokenQuotaByKeyRequest {
    UpdateTokenQuotaByKeyRequest {
        api_key: api_key.to_string(),
        remain_quota,
    }
}

// =============================================================================
// Create Token: Validation
// =============================================================================

#[rstest]
#[case::missing_username(CreateTokenBuilder::new().username(""), "Username is required")]
#[case::missing_password(CreateTokenBuilder::new().password(""), "Password is required")]
#[case::username_checked_first(
    CreateTokenBuilder::new().username("").password(""),
    "Username is required"
)]
#[case::name_too_long(
    CreateTokenBuilder::new().name(&"n".repeat(31)),
    "Token name too long (max 30 characters)"
)]
#[actix_rt::test]
async fn test_create_token_validation(#[case] builder: CreateTokenBuilder, #[case] message: &str) {
    let ctx = TestContext::new();
    ctx.create_user().await;

    let err = ctx.service.create_token(builder.build()).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), message);
    assert!(ctx.tokens.is_empty());
}

#[actix_rt::test]
async fn test_create_token_name_of_max_length_accepted() {
    let ctx = TestContext::new();
    ctx.create_user().await;
    let name = "n".repeat(30);

    let created = ctx
        .service
        .create_token(CreateTokenBuilder::new().name(&name).build())
        .await
        .unwrap();

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.name, name);
}

#[actix_rt::test]
async fn test_create_token_name_length_counts_characters() {
    let ctx = TestContext::new();
    ctx.create_user().await;
    // 30 characters, 60 bytes
    let name = "é".repeat(30);

    let result = ctx
        .service
        .create_token(CreateTokenBuilder::new().name(&name).build())
        .await;

    assert!(result.is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_overlong_names_rejected(name in "\\PC{31,60}") {
        let ctx = TestContext::new();
        let request = CreateTokenBuilder::new().name(&name).build();

        let result = actix_rt::System::new().block_on(ctx.service.create_token(request));

        prop_assert!(matches!(result, Err(AppError::Validation(_))));
        prop_assert!(ctx.tokens.is_empty());
    }
}

// =============================================================================
// Create Token: Defaults
// =============================================================================

#[actix_rt::test]
async fn test_create_token_applies_defaults() {
    let ctx = TestContext::new();
    let user = ctx.create_user().await;

    let created = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(created.user_id, user.id);
    let token = ctx.tokens.get_by_id(created.token_id).await.unwrap().unwrap();
    assert_eq!(token.name, "Auto-generated token");
    assert_eq!(token.remain_quota, 100_000);
    assert_eq!(token.expired_time, -1);
    assert_eq!(token.group, "default");
    assert_eq!(token.used_quota, 0);
    assert!(!token.unlimited_quota);
    assert!(!token.model_limits_enabled);
    assert_eq!(token.model_limits, "");
    assert_eq!(token.allow_ips, None);
    assert_eq!(token.created_time, token.accessed_time);
    assert!(token.created_time > 0);
}

#[rstest]
#[case::zero(0)]
#[case::negative(-50)]
#[actix_rt::test]
async fn test_create_token_non_positive_quota_uses_default(#[case] quota: i64) {
    let ctx = TestContext::new();
    let created = ctx.create_token(quota).await;

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 100_000);
}

#[actix_rt::test]
async fn test_create_token_keeps_explicit_values() {
    let ctx = TestContext::new();
    ctx.create_user().await;

    let created = ctx
        .service
        .create_token(
            CreateTokenBuilder::new()
                .name("billing")
                .remain_quota(42)
                .expired_time(1_900_000_000)
                .group("vip")
                .build(),
        )
        .await
        .unwrap();

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.name, "billing");
    assert_eq!(info.remain_quota, 42);
    assert_eq!(info.expired_time, 1_900_000_000);
    assert_eq!(info.group, "vip");
}

#[actix_rt::test]
async fn test_create_token_uses_configured_defaults() {
    let ctx = TestContext::with_defaults(QuotaDefaults {
        token_name: "Partner key".to_string(),
        remain_quota: 7,
        expired_time: 1_800_000_000,
        group: "partners".to_string(),
        max_name_length: 11,
    });
    ctx.create_user().await;

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().name("twelve chars").build())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Token name too long (max 11 characters)");

    let created = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap();
    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.name, "Partner key");
    assert_eq!(info.remain_quota, 7);
    assert_eq!(info.expired_time, 1_800_000_000);
    assert_eq!(info.group, "partners");
}

#[actix_rt::test]
async fn test_create_token_checks_length_of_default_name() {
    let ctx = TestContext::with_defaults(QuotaDefaults {
        token_name: "Nightly integration key".to_string(),
        max_name_length: 10,
        ..QuotaDefaults::default()
    });
    ctx.create_user().await;

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), "Token name too long (max 10 characters)");
    assert!(ctx.tokens.is_empty());
}

#[actix_rt::test]
async fn test_create_token_accepts_long_group() {
    let ctx = TestContext::new();
    ctx.create_user().await;
    let group = "g".repeat(200);

    let created = ctx
        .service
        .create_token(CreateTokenBuilder::new().group(&group).build())
        .await
        .unwrap();

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.group, group);
}

// =============================================================================
// Create Token: Authentication & Key Generation
// =============================================================================

#[actix_rt::test]
async fn test_create_token_wrong_password() {
    let ctx = TestContext::new();
    ctx.create_user().await;

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().password("wrong").build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(err.to_string(), "Invalid username or password");
}

#[actix_rt::test]
async fn test_create_token_unknown_user() {
    let ctx = TestContext::new();

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().username("nobody").build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[actix_rt::test]
async fn test_create_token_disabled_user() {
    let ctx = TestContext::new();
    let user = ctx.create_user().await;
    ctx.users.set_status(user.id, UserStatus::Disabled).unwrap();

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.to_string(), "User account is disabled");
    assert!(ctx.tokens.is_empty());
}

#[actix_rt::test]
async fn test_create_token_key_generation_failure() {
    let ctx = TestContext::with_key_generator(Arc::new(FailingKeyGenerator));
    ctx.create_user().await;

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(err.to_string().starts_with("Failed to generate API key"));
    assert!(ctx.tokens.is_empty());
}

#[actix_rt::test]
async fn test_create_token_rejects_malformed_generated_key() {
    let ctx = TestContext::with_key_generator(Arc::new(FixedKeyGenerator("sk-short".to_string())));
    ctx.create_user().await;

    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(err.to_string().starts_with("Failed to generate API key"));
    assert!(ctx.tokens.is_empty());
}

#[actix_rt::test]
async fn test_create_token_duplicate_key_is_internal_error() {
    let ctx = TestContext::with_key_generator(Arc::new(FixedKeyGenerator("k".repeat(48))));
    ctx.create_user().await;

    ctx.service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap();
    let err = ctx
        .service
        .create_token(CreateTokenBuilder::new().build())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(err.to_string().starts_with("Failed to create token"));
    assert_eq!(ctx.tokens.len(), 1);
}

#[actix_rt::test]
async fn test_created_keys_are_unique() {
    let ctx = TestContext::new();
    ctx.create_user().await;

    let mut keys = HashSet::new();
    for _ in 0..20 {
        let created = ctx
            .service
            .create_token(CreateTokenRequest {
                username: USERNAME.to_string(),
                password: PASSWORD.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.key.len(), KEY_LENGTH);
        assert!(keys.insert(created.key));
    }
}

// =============================================================================
// Update Quota
// =============================================================================

#[actix_rt::test]
async fn test_update_quota_overwrites() {
    let ctx = TestContext::new();
    let created = ctx.create_token(1_000).await;

    ctx.service
        .update_quota(
            UpdateTokenQuotaRequest {
                token_id: created.token_id,
                remain_quota: 500,
            },
            None,
        )
        .await
        .unwrap();

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 500);
}

#[actix_rt::test]
async fn test_update_quota_to_zero() {
    let ctx = TestContext::new();
    let created = ctx.create_token(1_000).await;

    ctx.service
        .update_quota_by_key(set_by_key(&created.key, 0), None)
        .await
        .unwrap();

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 0);
}

#[rstest]
#[case::zero_id(0, 10, "Invalid token_id: must be greater than 0")]
#[case::negative_id(-4, 10, "Invalid token_id: must be greater than 0")]
#[case::negative_quota(1, -1, "Invalid remain_quota: must be >= 0")]
#[actix_rt::test]
async fn test_update_quota_validation(
    #[case] token_id: i32,
    #[case] remain_quota: i64,
    #[case] message: &str,
) {
    let ctx = TestContext::new();
    let created = ctx.create_token(1_000).await;

    let err = ctx
        .service
        .update_quota(
            UpdateTokenQuotaRequest {
                token_id,
                remain_quota,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), message);

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 1_000);
}

#[actix_rt::test]
async fn test_update_quota_unknown_id() {
    let ctx = TestContext::new();

    let err = ctx
        .service
        .update_quota(
            UpdateTokenQuotaRequest {
                token_id: 999,
                remain_quota: 5,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(err.to_string().starts_with("Token not found"));
}

#[actix_rt::test]
async fn test_update_quota_by_key_accepts_prefixed_key() {
    let ctx = TestContext::new();
    let created = ctx.create_token(1_000).await;

    ctx.service
        .update_quota_by_key(set_by_key(&format!("sk-{}", created.key), 250), None)
        .await
        .unwrap();

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 250);
}

#[actix_rt::test]
async fn test_update_quota_by_key_unknown_key() {
    let ctx = TestContext::new();

    let err = ctx
        .service
        .update_quota_by_key(set_by_key("missing", 5), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[rstest]
#[case::empty("", 5, "API key is required")]
#[case::blank("   ", 5, "API key is required")]
#[case::bare_prefix("sk-", 5, "API key is required")]
#[case::negative_quota("somekey", -10, "Invalid remain_quota: must be >= 0")]
#[actix_rt::test]
async fn test_update_quota_by_key_validation(
    #[case] api_key: &str,
    #[case] remain_quota: i64,
    #[case] message: &str,
) {
    let ctx = TestContext::new();

    let err = ctx
        .service
        .update_quota_by_key(set_by_key(api_key, remain_quota), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), message);
}

// =============================================================================
// Add Quota
// =============================================================================

#[actix_rt::test]
async fn test_add_quota_is_additive() {
    let ctx = TestContext::new();
    let created = ctx.create_token(500).await;

    let new_quota = ctx
        .service
        .add_quota(add(&created.key, 300), None)
        .await
        .unwrap();

    assert_eq!(new_quota, 800);
    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 800);
}

#[rstest]
#[case::zero(0)]
#[case::negative(-100)]
#[actix_rt::test]
async fn test_add_quota_rejects_non_positive(#[case] add_quota: i64) {
    let ctx = TestContext::new();
    let created = ctx.create_token(500).await;

    let err = ctx
        .service
        .add_quota(add(&created.key, add_quota), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), "Invalid add_quota: must be greater than 0");

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 500);
}

#[actix_rt::test]
async fn test_add_quota_requires_key() {
    let ctx = TestContext::new();

    let err = ctx.service.add_quota(add("", 10), None).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), "API key is required");
}

#[actix_rt::test]
async fn test_add_quota_unknown_key() {
    let ctx = TestContext::new();

    let err = ctx
        .service
        .add_quota(add("missing", 10), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_rt::test]
async fn test_add_quota_overflow_is_internal_error() {
    let ctx = TestContext::new();
    let created = ctx.create_token(i64::MAX).await;

    let err = ctx
        .service
        .add_quota(add(&created.key, 1), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, i64::MAX);
}

// =============================================================================
// Quota Authorization
// =============================================================================

#[actix_rt::test]
async fn test_quota_updates_require_admin_secret_when_configured() {
    let ctx = TestContext::with_authorizer(Arc::new(SharedSecretAuthorizer::new("s3cret")));
    let created = ctx.create_token(500).await;

    let err = ctx
        .service
        .add_quota(add(&created.key, 100), Some("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = ctx
        .service
        .update_quota_by_key(set_by_key(&created.key, 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 500);

    ctx.service
        .add_quota(add(&created.key, 100), Some("s3cret"))
        .await
        .unwrap();
    let info = ctx.service.get_token_info(&created.key).await.unwrap();
    assert_eq!(info.remain_quota, 600);
}

#[actix_rt::test]
async fn test_validation_runs_before_authorization() {
    let ctx = TestContext::with_authorizer(Arc::new(SharedSecretAuthorizer::new("s3cret")));

    let err = ctx.service.add_quota(add("", 10), None).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

// =============================================================================
// Token Info
// =============================================================================

#[actix_rt::test]
async fn test_get_token_info() {
    let ctx = TestContext::new();
    let created = ctx.create_token(1_234).await;

    let info = ctx.service.get_token_info(&created.key).await.unwrap();

    assert_eq!(info.token_id, created.token_id);
    assert_eq!(info.remain_quota, 1_234);
    assert_eq!(info.used_quota, 0);
    assert_eq!(info.status, 1);
    assert_eq!(info.group, "default");
}

#[actix_rt::test]
async fn test_get_token_info_errors() {
    let ctx = TestContext::new();

    let err = ctx.service.get_token_info("").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = ctx.service.get_token_info("missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// =============================================================================
// Inactive Tokens
// =============================================================================

#[rstest]
#[case::disabled(TokenStatus::Disabled)]
#[case::expired(TokenStatus::Expired)]
#[case::exhausted(TokenStatus::Exhausted)]
#[actix_rt::test]
async fn test_key_operations_ignore_inactive_tokens(#[case] status: TokenStatus) {
    let ctx = TestContext::new();
    let created = ctx.create_token(500).await;
    ctx.tokens.set_status(created.token_id, status).unwrap();

    let err = ctx.service.get_token_info(&created.key).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = ctx
        .service
        .update_quota_by_key(set_by_key(&created.key, 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = ctx
        .service
        .add_quota(add(&created.key, 100), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let token = ctx.tokens.get_by_id(created.token_id).await.unwrap().unwrap();
    assert_eq!(token.remain_quota, 500);
}

#[actix_rt::test]
async fn test_update_quota_by_id_reaches_inactive_tokens() {
    let ctx = TestContext::new();
    let created = ctx.create_token(500).await;
    ctx.tokens
        .set_status(created.token_id, TokenStatus::Exhausted)
        .unwrap();

    ctx.service
        .update_quota(
            UpdateTokenQuotaRequest {
                token_id: created.token_id,
                remain_quota: 900,
            },
            None,
        )
        .await
        .unwrap();

    let token = ctx.tokens.get_by_id(created.token_id).await.unwrap().unwrap();
    assert_eq!(token.remain_quota, 900);
}

#[actix_rt::test]
async fn test_malformed_keys_are_not_found() {
    let ctx = TestContext::new();
    let created = ctx.create_token(500).await;
    let truncated = &created.key[..KEY_LENGTH - 1];

    let err = ctx.service.get_token_info(truncated).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = ctx
        .service
        .add_quota(add(truncated, 100), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
