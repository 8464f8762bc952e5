pub mod token_quota;

pub use token_quota::TokenQuotaService;
