//! Opaque key types shared across the data-access tier.
//!
//! Keys are case-sensitive strings assigned by operators, not surrogate
//! integers, so they get newtypes instead of raw `String`s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Login principal key (an administrator username).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tenant account key. Accounts form a forest through a nullable parent.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host key (hostname-like token) for a managed server.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display locale attached to a session. Mutable after login; everything
/// else about a session is fixed at establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static identifier of an entity collection.
///
/// Declared as a constant next to each collection; the invalidation
/// aggregator and the membership caches key on it. Serializes as the
/// bare collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityKind(&'static str);

impl EntityKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Entity kinds known to this tier.
pub mod kind {
    use super::EntityKind;

    pub const ACCOUNTS: EntityKind = EntityKind::new("accounts");
    pub const ACCOUNT_HOSTS: EntityKind = EntityKind::new("account_hosts");
    pub const ADMINISTRATORS: EntityKind = EntityKind::new("administrators");
    pub const DNS_ZONES: EntityKind = EntityKind::new("dns_zones");
    pub const LOGIN_HOSTS: EntityKind = EntityKind::new("login_hosts");
    pub const OPERATOR_GRANTS: EntityKind = EntityKind::new("operator_grants");
    pub const SERVER_FARMS: EntityKind = EntityKind::new("server_farms");
    pub const SERVER_REPLICATIONS: EntityKind = EntityKind::new("server_replications");
    pub const SERVERS: EntityKind = EntityKind::new("servers");
    pub const SITES: EntityKind = EntityKind::new("sites");
    pub const SITE_BINDS: EntityKind = EntityKind::new("site_binds");
}
