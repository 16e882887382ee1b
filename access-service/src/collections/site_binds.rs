//! Site bind collection.
//!
//! Binds carry a server but no account; tenant visibility rides on the
//! owning site's account through a join.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::collections::collection::{EntityCollection, ScopedRule, Viewer};
use crate::collections::columns::{ColumnRole, ColumnSpec, ColumnValue};
use crate::models::{kind, EntityKind, SiteBind};
use crate::services::error::AccessError;

pub static SITE_BIND_COLUMNS: &[ColumnSpec<SiteBind>] = &[
    ColumnSpec {
        name: "bind_id",
        role: ColumnRole::Primary,
        get: |row: &SiteBind| ColumnValue::Text(row.bind_id.to_string()),
    },
    ColumnSpec {
        name: "site_id",
        role: ColumnRole::Indexed,
        get: |row: &SiteBind| ColumnValue::Text(row.site_id.to_string()),
    },
    ColumnSpec {
        name: "server_id",
        role: ColumnRole::Indexed,
        get: |row: &SiteBind| ColumnValue::Text(row.server_id.as_str().to_owned()),
    },
    ColumnSpec {
        name: "port",
        role: ColumnRole::Indexed,
        get: |row: &SiteBind| ColumnValue::Int(row.port as i64),
    },
];

pub struct SiteBindCollection;

#[async_trait]
impl EntityCollection for SiteBindCollection {
    type Row = SiteBind;

    fn kind(&self) -> EntityKind {
        kind::SITE_BINDS
    }

    fn columns(&self) -> &'static [ColumnSpec<SiteBind>] {
        SITE_BIND_COLUMNS
    }

    fn scoped_rule(&self) -> ScopedRule {
        ScopedRule::DIRECT
    }

    async fn full_set(&self, db: &PgPool) -> Result<Vec<SiteBind>, AccessError> {
        sqlx::query_as::<_, SiteBind>("SELECT * FROM site_binds ORDER BY bind_id")
            .fetch_all(db)
            .await
            .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn scoped_set(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<SiteBind>, AccessError> {
        sqlx::query_as::<_, SiteBind>(
            "SELECT * FROM site_binds WHERE server_id = ANY($1) ORDER BY bind_id",
        )
        .bind(viewer.server_params())
        .fetch_all(db)
        .await
        .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }

    async fn tenant_set(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<SiteBind>, AccessError> {
        sqlx::query_as::<_, SiteBind>(
            "SELECT b.* FROM site_binds b \
             JOIN sites s ON b.site_id = s.site_id \
             WHERE s.account_id = ANY($1) ORDER BY b.bind_id",
        )
        .bind(viewer.account_params())
        .fetch_all(db)
        .await
        .map_err(|e| AccessError::Persistence(anyhow::anyhow!(e)))
    }
}
