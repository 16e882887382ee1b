//! DNS zone collection.
//!
//! Zones carry both an owning account and a hosting server, so every
//! tier filters directly without joins. Removal is the write path:
//! visibility is enforced by looking the zone up through the viewer
//! before deleting, and the touched account/server pair is recorded on
//! the unit of work.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::collections::collection::{EntityCollection, ScopedRule, Viewer};
use crate::collections::columns::{ColumnRole, ColumnSpec, ColumnValue};
use crate::models::{kind, DnsZone, EntityKind};
use crate::services::error::AccessError;
use crate::UnitOfWork;

pub static DNS_ZONE_COLUMNS: &[ColumnSpec<DnsZone>] = &[
    ColumnSpec {
        name: "zone_id",
        role: ColumnRole::Primary,
        get: |row: &DnsZone| ColumnValue::Text(row.zone_id.clone()),
    },
    ColumnSpec {
        name: "account_id",
        role: ColumnRole::Indexed,
        get: |row: &DnsZone| ColumnValue::Text(row.account_id.as_str().to_owned()),
    },
    ColumnSpec {
        name: "server_id",
        role: ColumnRole::Indexed,
        get: |row: &DnsZone| ColumnValue::Text(row.server_id.as_str().to_owned()),
    },
];

pub struct DnsZoneCollection;

#[async_trait]
impl EntityCollection for DnsZoneCollection {
    type Row = DnsZone;

    fn kind(&self) -> EntityKind {
        kind::DNS_ZONES
    }

    fn columns(&self) -> &'static [ColumnSpec<DnsZone>] {
        DNS_ZONE_COLUMNS
    }

    fn scoped_rule(&self) -> ScopedRule {
        ScopedRule::DIRECT
    }

    async fn full_set(&self, db: &PgPool) -> Result<Vec<DnsZone>, AccessError> {
        sqlx::query_as::<_, DnsZone>("SELECT * FROM dns_zones ORDER BY zone_id")
            .fetch_all(db)
            .await
            .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn scoped_set(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<DnsZone>, AccessError> {
        sqlx::query_as::<_, DnsZone>(
            "SELECT * FROM dns_zones WHERE server_id = ANY($1) ORDER BY zone_id",
        )
        .bind(viewer.server_params())
        .fetch_all(db)
        .await
        .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn tenant_set(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<DnsZone>, AccessError> {
        sqlx::query_as::<_, DnsZone>(
            "SELECT * FROM dns_zones WHERE account_id = ANY($1) ORDER BY zone_id",
        )
        .bind(viewer.account_params())
        .fetch_all(db)
        .await
        .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }
}

impl DnsZoneCollection {
    /// Delete a zone the viewer can see.
    ///
    /// The lookup runs through the viewer's tier filter, so a zone
    /// outside the caller's reach reads as absent. The deletion is
    /// recorded on the unit of work scoped to the zone's account and
    /// server.
    pub async fn remove(
        &self,
        db: &PgPool,
        viewer: &Viewer,
        unit: &mut UnitOfWork,
        zone_id: &str,
    ) -> Result<(), AccessError> {
        unit.require_writable()?;

        let zone = self
            .find_unique(
                db,
                viewer,
                "zone_id",
                &ColumnValue::Text(zone_id.to_owned()),
            )
            .await?
            .ok_or_else(|| {
                AccessError::Persistence(anyhow::anyhow!("DNS zone not found: {}", zone_id))
            })?;

        sqlx::query("DELETE FROM dns_zones WHERE zone_id = $1")
            .bind(&zone.zone_id)
            .execute(db)
            .await
            .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))?;

        unit.invalidations
            .add(kind::DNS_ZONES, Some(&zone.account_id), Some(&zone.server_id));
        tracing::info!(zone = %zone.zone_id, account = %zone.account_id, "dns zone removed");
        Ok(())
    }
}
