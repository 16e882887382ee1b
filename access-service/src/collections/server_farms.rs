//! Server farm collection.
//!
//! Farms are public topology: every tier sees the full list.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::collections::collection::{EntityCollection, ScopedRule, Viewer};
use crate::collections::columns::{ColumnRole, ColumnSpec, ColumnValue};
use crate::models::{kind, EntityKind, ServerFarm};
use crate::services::error::AccessError;

pub static SERVER_FARM_COLUMNS: &[ColumnSpec<ServerFarm>] = &[ColumnSpec {
    name: "farm_id",
    role: ColumnRole::Primary,
    get: |row: &ServerFarm| ColumnValue::Text(row.farm_id.clone()),
}];

pub struct ServerFarmCollection;

#[async_trait]
impl EntityCollection for ServerFarmCollection {
    type Row = ServerFarm;

    fn kind(&self) -> EntityKind {
        kind::SERVER_FARMS
    }

    fn columns(&self) -> &'static [ColumnSpec<ServerFarm>] {
        SERVER_FARM_COLUMNS
    }

    fn scoped_rule(&self) -> ScopedRule {
        ScopedRule::DIRECT
    }

    async fn full_set(&self, db: &PgPool) -> Result<Vec<ServerFarm>, AccessError> {
        sqlx::query_as::<_, ServerFarm>("SELECT * FROM server_farms ORDER BY farm_id")
            .fetch_all(db)
            .await
            .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn scoped_set(
        &self,
        db: &PgPool,
        _viewer: &Viewer,
    ) -> Result<Vec<ServerFarm>, AccessError> {
        self.full_set(db).await
    }

    async fn tenant_set(
        &self,
        db: &PgPool,
        _viewer: &Viewer,
    ) -> Result<Vec<ServerFarm>, AccessError> {
        self.full_set(db).await
    }
}
