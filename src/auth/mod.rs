pub mod bearer;
pub mod extractors;
pub mod quota;
pub mod token;

pub use bearer::parse_bearer_token;
pub use extractors::QuotaCaller;
pub use quota::{QuotaAuthorizer, SharedSecretAuthorizer, TrustedCaller};
pub use token::{is_valid_key_format, normalize_key, KeyGenerator, RandomKeyGenerator, KEY_LENGTH};
