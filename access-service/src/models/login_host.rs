//! Login host model - per-administrator host allow-list rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UserId;

/// Host allow-list entry.
///
/// An administrator with no rows accepts logins from any host; one or
/// more rows restrict logins to exactly those hosts. Hosts compare
/// case-insensitively and are stored lowercased.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoginHost {
    pub host_id: Uuid,
    pub username: UserId,
    pub host: String,
    pub created_utc: DateTime<Utc>,
}

impl LoginHost {
    pub fn new(username: UserId, host: &str) -> Self {
        Self {
            host_id: Uuid::new_v4(),
            username,
            host: host.to_lowercase(),
            created_utc: Utc::now(),
        }
    }
}
