//! Credential primitives for the taskdeck backend

pub mod credential;
pub mod password;

pub use credential::{
    new_bot_token, new_session_id, validate_bot_token, CredentialError, BOT_TOKEN_PREFIX,
};
pub use password::{hash_password, verify_password, PasswordError};
