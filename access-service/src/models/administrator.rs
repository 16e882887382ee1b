//! Administrator model - login principals owned by accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{AccountId, UserId};

/// Administrator entity.
///
/// `credential_hash` is an Argon2id PHC string for current identities, or
/// a legacy hex SHA-256 digest for populations not yet migrated. NULL
/// means no credential is set and the identity cannot log in.
#[derive(Debug, Clone, FromRow)]
pub struct Administrator {
    pub username: UserId,
    pub account_id: AccountId,
    pub credential_hash: Option<String>,
    pub disabled_flag: bool,
    pub can_delegate_flag: bool,
    pub created_utc: DateTime<Utc>,
}

impl Administrator {
    /// Create a new enabled administrator without a credential.
    pub fn new(username: UserId, account_id: AccountId) -> Self {
        Self {
            username,
            account_id,
            credential_hash: None,
            disabled_flag: false,
            can_delegate_flag: false,
            created_utc: Utc::now(),
        }
    }

    /// Check if the administrator may log in.
    pub fn is_enabled(&self) -> bool {
        !self.disabled_flag
    }

    /// Convert to a response without the credential hash.
    pub fn sanitized(&self) -> AdministratorResponse {
        AdministratorResponse::from(self.clone())
    }
}

/// Administrator response (without credential material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdministratorResponse {
    pub username: UserId,
    pub account_id: AccountId,
    pub disabled_flag: bool,
    pub can_delegate_flag: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Administrator> for AdministratorResponse {
    fn from(a: Administrator) -> Self {
        Self {
            username: a.username,
            account_id: a.account_id,
            disabled_flag: a.disabled_flag,
            can_delegate_flag: a.can_delegate_flag,
            created_utc: a.created_utc,
        }
    }
}
