use actix_web::{web, HttpResponse};

use crate::auth::QuotaCaller;
use crate::error::AppResult;
use crate::models::{
    AddTokenQuotaRequest, ApiResponse, CreateTokenRequest, TokenInfoRequest,
    UpdateTokenQuotaByKeyRequest, UpdateTokenQuotaRequest,
};
use crate::services::TokenQuotaService;

/// POST /api/token/auto_create - Create a token with username/password
pub async fn create_token(
    service: web::Data<TokenQuotaService>,
    body: web::Json<CreateTokenRequest>,
) -> AppResult<HttpResponse> {
    let created = service.create_token(body.into_inner()).await?;

    // Return full key (only time it's visible!)
    Ok(HttpResponse::Ok().json(ApiResponse::with_data(
        "Token created successfully",
        created,
    )))
}

/// PUT /api/token/quota - Overwrite quota by token id
pub async fn update_token_quota(
    service: web::Data<TokenQuotaService>,
    caller: QuotaCaller,
    body: web::Json<UpdateTokenQuotaRequest>,
) -> AppResult<HttpResponse> {
    service
        .update_quota(body.into_inner(), caller.credential())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Token quota updated successfully")))
}

/// PUT /api/token/quota/by_key - Overwrite quota by API key
pub async fn update_token_quota_by_key(
    service: web::Data<TokenQuotaService>,
    caller: QuotaCaller,
    body: web::Json<UpdateTokenQuotaByKeyRequest>,
) -> AppResult<HttpResponse> {
    service
        .update_quota_by_key(body.into_inner(), caller.credential())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Token quota updated successfully")))
}

/// POST /api/token/quota/add - Add quota by API key
pub async fn add_token_quota(
    service: web::Data<TokenQuotaService>,
    caller: QuotaCaller,
    body: web::Json<AddTokenQuotaRequest>,
) -> AppResult<HttpResponse> {
    service
        .add_quota(body.into_inner(), caller.credential())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Token quota added successfully")))
}

/// POST /api/token/info - Read token info by API key
pub async fn get_token_info(
    service: web::Data<TokenQuotaService>,
    body: web::Json<TokenInfoRequest>,
) -> AppResult<HttpResponse> {
    let info = service.get_token_info(&body.api_key).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_data(
        "Token information retrieved successfully",
        info,
    )))
}

/// Configure token routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/token")
            .app_data(super::json_config())
            .route("/auto_create", web::post().to(create_token))
            .route("/quota", web::put().to(update_token_quota))
            .route("/quota/by_key", web::put().to(update_token_quota_by_key))
            .route("/quota/add", web::post().to(add_token_quota))
            .route("/info", web::post().to(get_token_info)),
    );
}
