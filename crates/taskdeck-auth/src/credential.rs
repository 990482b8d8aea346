//! Opaque credential generation and the bot token wire format
//!
//! Two credential kinds exist on the wire: opaque session ids issued to
//! humans at login, and long-lived bot tokens of the form `bot_<hex>`.
//! The `bot_` prefix is part of the wire contract — request middleware
//! routes on it to pick the authentication strategy.

use thiserror::Error;
use uuid::Uuid;

/// Literal prefix carried by every bot API token.
pub const BOT_TOKEN_PREFIX: &str = "bot_";

/// Error types for credential parsing
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    /// Token does not match the `bot_<hex>` format
    #[error("invalid bot token format")]
    InvalidFormat,
}

/// Generate a fresh bot API token: `bot_` + 64 hex chars.
///
/// Entropy comes from two v4 UUIDs (~244 bits), which keeps the token
/// unguessable without another RNG dependency.
pub fn new_bot_token() -> String {
    format!(
        "{}{}{}",
        BOT_TOKEN_PREFIX,
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Generate an opaque session id for a human login.
pub fn new_session_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Check that a credential is a well-formed bot token.
///
/// Accepts exactly `bot_` followed by one or more lowercase hex digits.
/// Returns `InvalidFormat` otherwise; whether the token belongs to a live
/// bot is the store's concern, not the parser's.
pub fn validate_bot_token(token: &str) -> Result<(), CredentialError> {
    let rest = token
        .strip_prefix(BOT_TOKEN_PREFIX)
        .ok_or(CredentialError::InvalidFormat)?;

    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        return Err(CredentialError::InvalidFormat);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_bot_token_is_valid() {
        let token = new_bot_token();
        assert!(token.starts_with("bot_"));
        assert_eq!(token.len(), 4 + 64);
        assert!(validate_bot_token(&token).is_ok());
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(new_bot_token(), new_bot_token());
        assert_ne!(new_session_id(), new_session_id());
    }

    #[test]
    fn session_id_is_not_a_bot_token() {
        let session = new_session_id();
        assert!(!session.starts_with("bot_"));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(
            validate_bot_token("deadbeef"),
            Err(CredentialError::InvalidFormat)
        );
    }

    #[test]
    fn rejects_empty_body() {
        assert_eq!(
            validate_bot_token("bot_"),
            Err(CredentialError::InvalidFormat)
        );
    }

    #[test]
    fn rejects_non_hex_body() {
        assert_eq!(
            validate_bot_token("bot_nothexatall!"),
            Err(CredentialError::InvalidFormat)
        );
        assert_eq!(
            validate_bot_token("bot_DEADBEEF"),
            Err(CredentialError::InvalidFormat)
        );
    }
}
