//! Server models - fleet topology and account/server assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{AccountId, ServerId};

/// Managed server entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Server {
    pub server_id: ServerId,
    pub farm_id: String,
    pub failover_parent_id: Option<ServerId>,
    pub description: String,
    pub created_utc: DateTime<Utc>,
}

impl Server {
    pub fn new(server_id: ServerId, farm_id: impl Into<String>) -> Self {
        Self {
            server_id,
            farm_id: farm_id.into(),
            failover_parent_id: None,
            description: String::new(),
            created_utc: Utc::now(),
        }
    }

    pub fn with_failover_parent(mut self, parent: ServerId) -> Self {
        self.failover_parent_id = Some(parent);
        self
    }
}

/// Replication edge between two servers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServerReplication {
    pub replication_id: Uuid,
    pub source_server_id: ServerId,
    pub target_server_id: ServerId,
}

impl ServerReplication {
    pub fn new(source_server_id: ServerId, target_server_id: ServerId) -> Self {
        Self {
            replication_id: Uuid::new_v4(),
            source_server_id,
            target_server_id,
        }
    }
}

/// Assignment of a server to an account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountHost {
    pub account_id: AccountId,
    pub server_id: ServerId,
    pub created_utc: DateTime<Utc>,
}

/// Server farm entity (a physical location grouping servers).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServerFarm {
    pub farm_id: String,
    pub description: String,
}
