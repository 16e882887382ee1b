//! Account model - tenant accounts forming an ownership forest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::AccountId;

/// Account entity. `parent_account_id` is NULL for root accounts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: AccountId,
    pub parent_account_id: Option<AccountId>,
    pub created_utc: DateTime<Utc>,
}

impl Account {
    /// Create a new account under an optional parent.
    pub fn new(account_id: AccountId, parent_account_id: Option<AccountId>) -> Self {
        Self {
            account_id,
            parent_account_id,
            created_utc: Utc::now(),
        }
    }

    /// Check if this is a root account.
    pub fn is_root(&self) -> bool {
        self.parent_account_id.is_none()
    }
}
