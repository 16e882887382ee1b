//! Site models - hosted sites and their bound ports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{AccountId, ServerId};

/// Hosted site entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub site_id: Uuid,
    pub account_id: AccountId,
    pub server_id: ServerId,
    pub site_name: String,
    pub created_utc: DateTime<Utc>,
}

impl Site {
    pub fn new(account_id: AccountId, server_id: ServerId, site_name: impl Into<String>) -> Self {
        Self {
            site_id: Uuid::new_v4(),
            account_id,
            server_id,
            site_name: site_name.into(),
            created_utc: Utc::now(),
        }
    }
}

/// Bound port of a site. Ownership is reached through the site row, not
/// stored on the bind itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteBind {
    pub bind_id: Uuid,
    pub site_id: Uuid,
    pub server_id: ServerId,
    pub port: i32,
    pub created_utc: DateTime<Utc>,
}

impl SiteBind {
    pub fn new(site_id: Uuid, server_id: ServerId, port: i32) -> Self {
        Self {
            bind_id: Uuid::new_v4(),
            site_id,
            server_id,
            port,
            created_utc: Utc::now(),
        }
    }
}
