//! Operator grant model - fleet-operator entries for administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ServerId, UserId};

/// Operator grant entity.
///
/// An administrator holding at least one active grant is a fleet operator.
/// A NULL `server_id` row grants the whole fleet; any non-NULL row narrows
/// the administrator to the listed servers instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OperatorGrant {
    pub grant_id: Uuid,
    pub username: UserId,
    pub server_id: Option<ServerId>,
    pub active_flag: bool,
    pub created_utc: DateTime<Utc>,
}

impl OperatorGrant {
    /// Create a new active grant, fleet-wide when `server_id` is None.
    pub fn new(username: UserId, server_id: Option<ServerId>) -> Self {
        Self {
            grant_id: Uuid::new_v4(),
            username,
            server_id,
            active_flag: true,
            created_utc: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_flag
    }
}
