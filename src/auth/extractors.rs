use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::bearer::parse_bearer_token;
use crate::error::AppError;

/// Extractor for the credential presented on quota mutation endpoints
///
/// Never rejects by itself; the service hands `credential` to its
/// [`QuotaAuthorizer`](crate::auth::QuotaAuthorizer) after validating the body.
///
/// Usage in handlers:
/// ```ignore
/// async fn my_handler(caller: QuotaCaller) -> HttpResponse {
///     // caller.credential is the bearer token, if one was sent
/// }
/// ```
pub struct QuotaCaller {
    pub credential: Option<String>,
}

impl QuotaCaller {
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

impl FromRequest for QuotaCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let credential = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(parse_bearer_token)
            .map(|s| s.to_string());

        ready(Ok(QuotaCaller { credential }))
    }
}
