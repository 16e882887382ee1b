//! Data-access tier for the hosting platform: caller classification,
//! account hierarchy, login and session management, tier-filtered
//! entity collections, and invalidation signaling for completed units
//! of work.

pub mod collections;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use platform_core::error::AppError;

use crate::collections::{
    DnsZoneCollection, ScopedRule, ServerCollection, ServerFarmCollection, SiteBindCollection,
    Viewer,
};
use crate::config::AccessConfig;
use crate::models::{ServerId, UserId};
use crate::services::{
    AccessError, AccessTier, AccountClassifier, AccountHierarchy, ConnectorService, Directory,
    InvalidationAggregator, InvalidationBroker, InvalidationSnapshot, LoginRequest, PgDirectory,
    Session, SessionCache, SessionCacheStats, SessionToken,
};

/// One caller-scoped mutation scope.
///
/// Carries the session it runs as and collects invalidations until the
/// caller commits its own transaction and completes the unit.
pub struct UnitOfWork {
    pub unit_id: Uuid,
    session: Arc<Session>,
    pub invalidations: InvalidationAggregator,
}

impl UnitOfWork {
    fn new(session: Arc<Session>) -> Self {
        Self {
            unit_id: Uuid::new_v4(),
            session,
            invalidations: InvalidationAggregator::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Reject writes through read-only sessions.
    pub fn require_writable(&self) -> Result<(), AccessError> {
        if self.session.is_read_only() {
            return Err(AccessError::ReadOnlySession);
        }
        Ok(())
    }
}

/// Shared service wiring, cloned per caller.
#[derive(Clone)]
pub struct AccessState {
    pub config: AccessConfig,
    pub pool: PgPool,
    pub directory: Arc<dyn Directory>,
    pub hierarchy: Arc<AccountHierarchy>,
    pub classifier: Arc<AccountClassifier>,
    pub connector: Arc<ConnectorService>,
    pub sessions: Arc<SessionCache>,
    pub broker: Arc<InvalidationBroker>,
    pub servers: Arc<ServerCollection>,
    pub server_farms: Arc<ServerFarmCollection>,
    pub dns_zones: Arc<DnsZoneCollection>,
    pub site_binds: Arc<SiteBindCollection>,
}

impl AccessState {
    /// Connect to PostgreSQL, run migrations, and wire every service.
    pub async fn build(config: AccessConfig) -> Result<Self, AppError> {
        let pool = db::create_pool(&config.database)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        let directory: Arc<dyn Directory> = Arc::new(PgDirectory::new(pool.clone()));
        Ok(Self::assemble(config, pool, directory))
    }

    /// Wire the state over any directory implementation. Tests use
    /// this with `MemoryDirectory` and a lazily-connected pool.
    pub fn with_directory(
        config: AccessConfig,
        pool: PgPool,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self::assemble(config, pool, directory)
    }

    fn assemble(config: AccessConfig, pool: PgPool, directory: Arc<dyn Directory>) -> Self {
        let hierarchy = Arc::new(AccountHierarchy::new(
            directory.clone(),
            config.hierarchy.max_depth,
        ));
        let classifier = Arc::new(AccountClassifier::new(directory.clone()));
        let sessions = Arc::new(SessionCache::new(
            config.session.idle_ttl(),
            config.session.max_entries,
        ));
        let connector = Arc::new(ConnectorService::new(
            classifier.clone(),
            hierarchy.clone(),
            sessions.clone(),
        ));
        Self {
            config,
            pool,
            directory,
            hierarchy,
            classifier,
            connector,
            sessions,
            broker: Arc::new(InvalidationBroker::new()),
            servers: Arc::new(ServerCollection),
            server_farms: Arc::new(ServerFarmCollection),
            dns_zones: Arc::new(DnsZoneCollection),
            site_binds: Arc::new(SiteBindCollection),
        }
    }

    // ==================== Session Operations ====================

    pub async fn login(
        &self,
        origin_host: &str,
        req: LoginRequest,
    ) -> Result<Arc<Session>, AccessError> {
        self.connector.login(origin_host, req).await
    }

    pub fn find_session(&self, token: &SessionToken) -> Option<Arc<Session>> {
        self.connector.find_session(token)
    }

    pub fn logout(&self, token: &SessionToken) -> bool {
        self.connector.logout(token)
    }

    pub fn session_stats(&self) -> SessionCacheStats {
        self.sessions.stats()
    }

    // ==================== Unit of Work Operations ====================

    pub fn begin_unit(&self, session: Arc<Session>) -> UnitOfWork {
        UnitOfWork::new(session)
    }

    /// Complete a unit of work after the caller committed its own
    /// transaction: snapshot the collected invalidations, let the
    /// classifier react, then fan out to every registered sink.
    pub async fn complete_unit(&self, unit: UnitOfWork) -> InvalidationSnapshot {
        let snapshot = unit.invalidations.snapshot(unit.unit_id);
        if !snapshot.is_empty() {
            self.classifier.apply_invalidations(&snapshot);
            self.broker.publish(&snapshot).await;
            tracing::info!(
                unit_id = %snapshot.unit_id(),
                kinds = snapshot.iter().count(),
                "unit of work completed"
            );
        }
        snapshot
    }

    // ==================== Viewer Operations ====================

    /// Resolve a session's reach for one collection's scoped rule.
    ///
    /// A scoped session carrying a server scope is narrowed to that
    /// server; the scope can never add reach the grants don't give.
    pub async fn viewer(
        &self,
        session: &Session,
        rule: ScopedRule,
    ) -> Result<Viewer, AccessError> {
        let tier = session.tier();
        let mut reachable_servers = HashSet::new();
        let mut visible_accounts = HashSet::new();

        match tier {
            AccessTier::Scoped => {
                reachable_servers = self.reachable_servers(session.connect_as(), rule).await?;
                if let Some(scope) = session.server_scope() {
                    reachable_servers.retain(|s| s == scope);
                }
            }
            AccessTier::Tenant => {
                visible_accounts = self.hierarchy.visible_accounts(session.account_id()).await?;
            }
            AccessTier::Privileged | AccessTier::Disabled => {}
        }

        Ok(Viewer {
            username: session.connect_as().clone(),
            account_id: session.account_id().clone(),
            tier,
            reachable_servers,
            visible_accounts,
        })
    }

    /// Expand a scoped operator's direct grants per a collection rule:
    /// failover parents, failover children, and replication targets
    /// join the reach when the rule asks for them.
    pub async fn reachable_servers(
        &self,
        username: &UserId,
        rule: ScopedRule,
    ) -> Result<HashSet<ServerId>, AccessError> {
        let base = self.classifier.administered_servers(username).await?;
        if base.is_empty() {
            return Ok(base);
        }
        let mut reach = base.clone();

        if rule.failover_parent || rule.failover_children {
            let servers = self
                .directory
                .load_servers()
                .await
                .map_err(AccessError::Persistence)?;
            for server in &servers {
                if let Some(parent) = &server.failover_parent_id {
                    if rule.failover_parent && base.contains(&server.server_id) {
                        reach.insert(parent.clone());
                    }
                    if rule.failover_children && base.contains(parent) {
                        reach.insert(server.server_id.clone());
                    }
                }
            }
        }

        if rule.replication_targets {
            let replications = self
                .directory
                .load_server_replications()
                .await
                .map_err(AccessError::Persistence)?;
            for edge in &replications {
                if base.contains(&edge.source_server_id) {
                    reach.insert(edge.target_server_id.clone());
                }
            }
        }

        Ok(reach)
    }

    // ==================== Health ====================

    pub async fn health_check(&self) -> Result<(), AppError> {
        db::health_check(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}
