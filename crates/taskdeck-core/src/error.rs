//! Error taxonomy for the core services
//!
//! Authentication failures, authorization failures, validation failures,
//! not-found and transactional failures are distinct variants so callers
//! can map them to distinct outcomes. Nothing here is retried internally.

use sea_orm::{DbErr, TransactionError};
use taskdeck_auth::PasswordError;
use taskdeck_db::entities::bot::Capability;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Credential claimed to be a bot token but did not match `bot_<hex>`
    #[error("invalid token format")]
    InvalidTokenFormat,

    /// Well-formed bot token with no matching active bot
    #[error("invalid or inactive token")]
    InvalidOrInactiveToken,

    /// Missing, expired or unusable session; also failed logins
    #[error("unauthenticated")]
    Unauthenticated,

    /// Principal is known but lacks the capability
    #[error("missing capability '{0}'")]
    Forbidden(Capability),

    /// Operation is only meaningful for a human principal
    #[error("operation requires a human principal")]
    HumanRequired,

    /// Caller must correct the input; no partial writes occurred
    #[error("{0}")]
    Validation(String),

    /// Stale or forged identifier
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("team name '{0}' is already taken")]
    DuplicateTeamName(String),

    #[error("user is already a member or has a pending request for this team")]
    AlreadyRequestedOrMember,

    #[error("acting user is not an admin of this team")]
    NotTeamAdmin,

    #[error("no transfer target available for owned content")]
    NoTransferTargetAvailable,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// All failures surfaced to the caller as "unauthenticated".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Error::InvalidTokenFormat | Error::InvalidOrInactiveToken | Error::Unauthenticated
        )
    }
}

impl From<TransactionError<Error>> for Error {
    fn from(err: TransactionError<Error>) -> Self {
        match err {
            TransactionError::Connection(e) => Error::Db(e),
            TransactionError::Transaction(e) => e,
        }
    }
}
