/// Extracts the credential from an `Authorization: Bearer <token>` value
///
/// Returns `None` when the scheme is not `Bearer` or the credential is blank.
pub fn parse_bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
