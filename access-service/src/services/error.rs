use crate::models::{AccountId, EntityKind, UserId};
use platform_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Incomplete login: connect-as user, authenticate-as user, and credential are all required")]
    IncompleteLogin,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Bad credential")]
    BadCredential,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("Delegation not allowed: {authenticate_as} may not act as {connect_as}")]
    DelegationNotAllowed {
        authenticate_as: UserId,
        connect_as: UserId,
    },

    #[error("Account hierarchy deeper than {max_depth} walking up from {account}")]
    HierarchyTooDeep { account: AccountId, max_depth: u32 },

    #[error("Column {column} on {kind} matched {count} rows, expected at most one")]
    UniquenessViolation {
        kind: EntityKind,
        column: &'static str,
        count: usize,
    },

    #[error("Unknown column {column} on {kind}")]
    UnknownColumn { kind: EntityKind, column: String },

    #[error("Session is read-only")]
    ReadOnlySession,

    #[error("Persistence failure: {0}")]
    Persistence(anyhow::Error),
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::IncompleteLogin => AppError::BadRequest(anyhow::anyhow!("{}", err)),
            AccessError::AccountNotFound => AppError::NotFound(anyhow::anyhow!("{}", err)),
            AccessError::BadCredential => AppError::AuthError(anyhow::anyhow!("{}", err)),
            AccessError::AccountDisabled => AppError::Forbidden(anyhow::anyhow!("{}", err)),
            AccessError::HostNotAllowed(_) => AppError::Forbidden(anyhow::anyhow!("{}", err)),
            AccessError::DelegationNotAllowed { .. } => {
                AppError::Forbidden(anyhow::anyhow!("{}", err))
            }
            AccessError::HierarchyTooDeep { .. } => {
                AppError::InternalError(anyhow::anyhow!("{}", err))
            }
            AccessError::UniquenessViolation { .. } => {
                AppError::Conflict(anyhow::anyhow!("{}", err))
            }
            AccessError::UnknownColumn { .. } => AppError::BadRequest(anyhow::anyhow!("{}", err)),
            AccessError::ReadOnlySession => AppError::Forbidden(anyhow::anyhow!("{}", err)),
            AccessError::Persistence(e) => AppError::DatabaseError(e),
        }
    }
}
