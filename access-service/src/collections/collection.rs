//! The contract every entity collection implements.
//!
//! A collection supplies three row filters, one per visible tier, and
//! the provided methods layer tier dispatch, column lookups, and
//! uniqueness checks on top. Disabled callers are rejected before any
//! query runs.
//!
//! Two uniform fallbacks recur across collections: public collections
//! delegate `scoped_set` and `tenant_set` to `full_set`, and
//! privileged-only collections return an empty vec from both.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::collections::columns::{self, ColumnSpec, ColumnValue};
use crate::models::{AccountId, EntityKind, ServerId, UserId};
use crate::services::error::AccessError;
use crate::services::AccessTier;

/// The resolved identity a read runs as: tier plus the reach that tier
/// grants, computed once per request.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub username: UserId,
    pub account_id: AccountId,
    pub tier: AccessTier,
    /// Servers a scoped operator reaches, grant servers expanded per
    /// the collection's rule. Empty for other tiers.
    pub reachable_servers: HashSet<ServerId>,
    /// Accounts a tenant caller sees. Empty for other tiers.
    pub visible_accounts: HashSet<AccountId>,
}

impl Viewer {
    /// Server reach as a sorted bind parameter for `= ANY($1)`.
    pub fn server_params(&self) -> Vec<String> {
        let mut params: Vec<String> = self
            .reachable_servers
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect();
        params.sort();
        params
    }

    /// Account reach as a sorted bind parameter for `= ANY($1)`.
    pub fn account_params(&self) -> Vec<String> {
        let mut params: Vec<String> = self
            .visible_accounts
            .iter()
            .map(|a| a.as_str().to_owned())
            .collect();
        params.sort();
        params
    }
}

/// How far past its direct grants a scoped operator reaches for one
/// collection: failover relatives and replication targets are opt-in
/// per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopedRule {
    pub failover_parent: bool,
    pub failover_children: bool,
    pub replication_targets: bool,
}

impl ScopedRule {
    /// Direct grants only.
    pub const DIRECT: ScopedRule = ScopedRule {
        failover_parent: false,
        failover_children: false,
        replication_targets: false,
    };

    /// Direct grants plus failover relatives and replication targets.
    pub const FULL: ScopedRule = ScopedRule {
        failover_parent: true,
        failover_children: true,
        replication_targets: true,
    };
}

#[async_trait]
pub trait EntityCollection: Send + Sync {
    type Row: Send + Sync + 'static;

    fn kind(&self) -> EntityKind;
    fn columns(&self) -> &'static [ColumnSpec<Self::Row>];
    fn scoped_rule(&self) -> ScopedRule;

    /// Everything, for privileged callers.
    async fn full_set(&self, db: &PgPool) -> Result<Vec<Self::Row>, AccessError>;

    /// Rows reachable through the viewer's server reach.
    async fn scoped_set(
        &self,
        db: &PgPool,
        viewer: &Viewer,
    ) -> Result<Vec<Self::Row>, AccessError>;

    /// Rows owned by the viewer's visible accounts.
    async fn tenant_set(
        &self,
        db: &PgPool,
        viewer: &Viewer,
    ) -> Result<Vec<Self::Row>, AccessError>;

    /// Tier-dispatched row set. Disabled callers are rejected before
    /// any filter runs.
    async fn rows(&self, db: &PgPool, viewer: &Viewer) -> Result<Vec<Self::Row>, AccessError> {
        match viewer.tier {
            AccessTier::Disabled => Err(AccessError::AccountDisabled),
            AccessTier::Privileged => self.full_set(db).await,
            AccessTier::Scoped => self.scoped_set(db, viewer).await,
            AccessTier::Tenant => self.tenant_set(db, viewer).await,
        }
    }

    /// Rows whose declared column matches a value. Unknown column
    /// names are a typed error.
    async fn find_by_column(
        &self,
        db: &PgPool,
        viewer: &Viewer,
        column: &str,
        value: &ColumnValue,
    ) -> Result<Vec<Self::Row>, AccessError> {
        let spec =
            columns::find(self.columns(), column).ok_or_else(|| AccessError::UnknownColumn {
                kind: self.kind(),
                column: column.to_owned(),
            })?;
        let rows = self.rows(db, viewer).await?;
        Ok(rows.into_iter().filter(|r| (spec.get)(r) == *value).collect())
    }

    /// At-most-one lookup. The single-row claim is verified on every
    /// call; more than one match is an integrity error.
    async fn find_unique(
        &self,
        db: &PgPool,
        viewer: &Viewer,
        column: &str,
        value: &ColumnValue,
    ) -> Result<Option<Self::Row>, AccessError> {
        let spec =
            columns::find(self.columns(), column).ok_or_else(|| AccessError::UnknownColumn {
                kind: self.kind(),
                column: column.to_owned(),
            })?;
        let mut matches: Vec<Self::Row> = self
            .rows(db, viewer)
            .await?
            .into_iter()
            .filter(|r| (spec.get)(r) == *value)
            .collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(AccessError::UniquenessViolation {
                kind: self.kind(),
                column: spec.name,
                count,
            }),
        }
    }
}
