//! Server collection.
//!
//! Scoped operators see their full reach here: failover relatives and
//! replication targets included.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::collections::collection::{EntityCollection, ScopedRule, Viewer};
use crate::collections::columns::{ColumnRole, ColumnSpec, ColumnValue};
use crate::models::{kind, EntityKind, Server};
use crate::services::error::AccessError;

pub static SERVER_COLUMNS: &[ColumnSpec<Server>] = &[
    ColumnSpec {
        name: "server_id",
        role: ColumnRole::Primary,
        get: |row: &Server| ColumnValue::Text(row.server_id.as_str().to_owned()),
    },
    ColumnSpec {
        name: "farm_id",
        role: ColumnRole::Indexed,
        get: |row: &Server| ColumnValue::Text(row.farm_id.clone()),
    },
    ColumnSpec {
        name: "failover_parent_id",
        role: ColumnRole::Indexed,
        get: |row: &Server| match &row.failover_parent_id {
            Some(parent) => ColumnValue::Text(parent.as_str().to_owned()),
            None => ColumnValue::Null,
        },
    },
];

pub struct ServerCollection;

#[async_trait]
impl EntityCollection for ServerCollection {
    type Row = Server;

    fn kind(&self) -> EntityKind {
        kind::SERVERS
    }

    fn columns(&self) -> &'static [ColumnSpec<Server>] {
        SERVER_COLUMNS
    }

    fn scoped_rule(&self) -> ScopedRule {
        ScopedRule::FULL
    }

    async fn full_set(&self, db: &PgPool) -> Result<Vec<Server>, AccessError> {
        sqlx::query_as::<_, Server>("SELECT * FROM servers ORDER BY server_id")
            .fetch_all(db)
            .await
            .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn scoped_set(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<Server>, AccessError> {
        sqlx::query_as::<_, Server>(
            "SELECT * FROM servers WHERE server_id = ANY($1) ORDER BY server_id",
        )
        .bind(viewer.server_params())
        .fetch_all(db)
        .await
        .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn tenant_set(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<Server>, AccessError> {
        sqlx::query_as::<_, Server>(
            "SELECT DISTINCT s.* FROM servers s \
             JOIN account_hosts ah ON s.server_id = ah.server_id \
             WHERE ah.account_id = ANY($1) ORDER BY s.server_id",
        )
        .bind(viewer.account_params())
        .fetch_all(db)
        .await
        .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }
}
