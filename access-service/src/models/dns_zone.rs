//! DNS zone model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{AccountId, ServerId};

/// DNS zone entity, owned by an account and hosted on a primary
/// nameserver.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DnsZone {
    pub zone_id: String,
    pub account_id: AccountId,
    pub server_id: ServerId,
    pub created_utc: DateTime<Utc>,
}

impl DnsZone {
    pub fn new(zone_id: impl Into<String>, account_id: AccountId, server_id: ServerId) -> Self {
        Self {
            zone_id: zone_id.into(),
            account_id,
            server_id,
            created_utc: Utc::now(),
        }
    }
}
