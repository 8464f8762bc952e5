pub mod response;
pub mod token;
pub mod user;

pub use response::ApiResponse;
pub use token::{
    AddTokenQuotaRequest, CreateTokenRequest, NewToken, Token, TokenCreatedData, TokenInfoData,
    TokenInfoRequest, TokenStatus, UpdateTokenQuotaByKeyRequest, UpdateTokenQuotaRequest,
};
pub use user::{User, UserStatus};
