//! Caller classification into access tiers.
//!
//! Tier is a pure function of three membership sets: fleet-operator
//! grants, grant server restrictions, and enabled administrators. The
//! sets are full-scan snapshots held in versioned caches and rebuilt
//! after the tables behind them change.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

use serde::{Deserialize, Serialize};

use crate::models::{kind, Administrator, ServerId, UserId};
use crate::services::cache::VersionedCache;
use crate::services::directory::Directory;
use crate::services::error::AccessError;
use crate::services::invalidation::InvalidationSnapshot;

/// Access tier of a caller. Exactly one applies to any identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    /// Fleet operator without server restrictions: sees everything.
    Privileged,
    /// Fleet operator restricted to a server set.
    Scoped,
    /// Regular enabled administrator: sees its account reach.
    Tenant,
    /// Unknown or disabled identity: sees nothing.
    Disabled,
}

impl AccessTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Privileged => "privileged",
            AccessTier::Scoped => "scoped",
            AccessTier::Tenant => "tenant",
            AccessTier::Disabled => "disabled",
        }
    }
}

type AdminMap = HashMap<UserId, Administrator>;
/// Active-grant index: present key = fleet operator; empty server set =
/// unrestricted, non-empty = restricted to those servers.
type GrantIndex = HashMap<UserId, HashSet<ServerId>>;
type HostIndex = HashMap<UserId, HashSet<String>>;

pub struct AccountClassifier {
    directory: Arc<dyn Directory>,
    admins: VersionedCache<AdminMap>,
    grants: VersionedCache<GrantIndex>,
    hosts: VersionedCache<HostIndex>,
}

impl AccountClassifier {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            admins: VersionedCache::new(),
            grants: VersionedCache::new(),
            hosts: VersionedCache::new(),
        }
    }

    /// Resolve the tier of an identity.
    ///
    /// The checks are ordered and mutually exclusive: fleet operators
    /// first (unrestricted, then restricted), every other enabled
    /// administrator is tenant tier, and everything else, unknown
    /// identities included, is disabled.
    #[instrument(skip(self))]
    pub async fn classify(&self, username: &UserId) -> Result<AccessTier, AccessError> {
        let admins = self.administrators().await?;
        let enabled = match admins.get(username) {
            Some(admin) => admin.is_enabled(),
            None => false,
        };
        if !enabled {
            return Ok(AccessTier::Disabled);
        }

        let tier = match self.grant_index().await?.get(username) {
            Some(servers) if servers.is_empty() => AccessTier::Privileged,
            Some(_) => AccessTier::Scoped,
            None => AccessTier::Tenant,
        };

        tracing::debug!(user = %username, tier = tier.as_str(), "caller classified");
        Ok(tier)
    }

    /// Cached administrator row, if any.
    pub async fn administrator(
        &self,
        username: &UserId,
    ) -> Result<Option<Administrator>, AccessError> {
        Ok(self.administrators().await?.get(username).cloned())
    }

    /// Servers a scoped operator administers directly. Empty for
    /// everyone else.
    pub async fn administered_servers(
        &self,
        username: &UserId,
    ) -> Result<HashSet<ServerId>, AccessError> {
        Ok(self
            .grant_index()
            .await?
            .get(username)
            .cloned()
            .unwrap_or_default())
    }

    /// Host allow-list for an identity. `None` means no rows exist and
    /// any host is accepted.
    pub async fn allowed_hosts(
        &self,
        username: &UserId,
    ) -> Result<Option<HashSet<String>>, AccessError> {
        Ok(self.host_index().await?.get(username).cloned())
    }

    /// React to a completed unit of work: bump the version of every
    /// cache whose backing table was touched.
    pub fn apply_invalidations(&self, snapshot: &InvalidationSnapshot) {
        if snapshot.touches(kind::ADMINISTRATORS) {
            self.admins.invalidate();
        }
        if snapshot.touches(kind::OPERATOR_GRANTS) {
            self.grants.invalidate();
        }
        if snapshot.touches(kind::LOGIN_HOSTS) {
            self.hosts.invalidate();
        }
    }

    async fn administrators(&self) -> Result<Arc<AdminMap>, AccessError> {
        let directory = self.directory.clone();
        self.admins
            .get_or_build(move || async move {
                let rows = directory
                    .load_administrators()
                    .await
                    .map_err(AccessError::Persistence)?;
                let count = rows.len();
                let map: AdminMap = rows.into_iter().map(|a| (a.username.clone(), a)).collect();
                tracing::info!(administrators = count, "administrator cache built");
                Ok(map)
            })
            .await
    }

    async fn grant_index(&self) -> Result<Arc<GrantIndex>, AccessError> {
        let directory = self.directory.clone();
        self.grants
            .get_or_build(move || async move {
                let rows = directory
                    .load_operator_grants()
                    .await
                    .map_err(AccessError::Persistence)?;
                let mut index: GrantIndex = HashMap::new();
                for grant in rows.into_iter().filter(|g| g.is_active()) {
                    let servers = index.entry(grant.username).or_default();
                    if let Some(server_id) = grant.server_id {
                        servers.insert(server_id);
                    }
                }
                tracing::info!(operators = index.len(), "operator grant cache built");
                Ok(index)
            })
            .await
    }

    async fn host_index(&self) -> Result<Arc<HostIndex>, AccessError> {
        let directory = self.directory.clone();
        self.hosts
            .get_or_build(move || async move {
                let rows = directory
                    .load_login_hosts()
                    .await
                    .map_err(AccessError::Persistence)?;
                let mut index: HostIndex = HashMap::new();
                for row in rows {
                    index
                        .entry(row.username)
                        .or_default()
                        .insert(row.host.to_lowercase());
                }
                Ok(index)
            })
            .await
    }
}
