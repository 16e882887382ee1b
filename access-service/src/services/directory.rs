//! Directory boundary - read access to the identity and topology tables.
//!
//! Everything the classifier, hierarchy, and login path read goes through
//! this trait so tests can run against an in-memory directory.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::models::{
    Account, AccountId, Administrator, LoginHost, OperatorGrant, Server, ServerReplication, UserId,
};

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_administrator(
        &self,
        username: &UserId,
    ) -> Result<Option<Administrator>, anyhow::Error>;
    async fn load_administrators(&self) -> Result<Vec<Administrator>, anyhow::Error>;
    async fn load_operator_grants(&self) -> Result<Vec<OperatorGrant>, anyhow::Error>;
    async fn load_login_hosts(&self) -> Result<Vec<LoginHost>, anyhow::Error>;
    async fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, anyhow::Error>;
    async fn child_accounts(&self, account_id: &AccountId) -> Result<Vec<Account>, anyhow::Error>;
    async fn load_servers(&self) -> Result<Vec<Server>, anyhow::Error>;
    async fn load_server_replications(&self) -> Result<Vec<ServerReplication>, anyhow::Error>;
}

/// PostgreSQL-backed directory.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_administrator(
        &self,
        username: &UserId,
    ) -> Result<Option<Administrator>, anyhow::Error> {
        sqlx::query_as::<_, Administrator>("SELECT * FROM administrators WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn load_administrators(&self) -> Result<Vec<Administrator>, anyhow::Error> {
        sqlx::query_as::<_, Administrator>("SELECT * FROM administrators ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn load_operator_grants(&self) -> Result<Vec<OperatorGrant>, anyhow::Error> {
        sqlx::query_as::<_, OperatorGrant>(
            "SELECT * FROM operator_grants WHERE active_flag = true",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn load_login_hosts(&self) -> Result<Vec<LoginHost>, anyhow::Error> {
        sqlx::query_as::<_, LoginHost>("SELECT * FROM login_hosts")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, anyhow::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn child_accounts(&self, account_id: &AccountId) -> Result<Vec<Account>, anyhow::Error> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE parent_account_id = $1 ORDER BY account_id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn load_servers(&self) -> Result<Vec<Server>, anyhow::Error> {
        sqlx::query_as::<_, Server>("SELECT * FROM servers ORDER BY server_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn load_server_replications(&self) -> Result<Vec<ServerReplication>, anyhow::Error> {
        sqlx::query_as::<_, ServerReplication>("SELECT * FROM server_replications")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

/// In-memory directory for tests and fixtures.
#[derive(Default)]
pub struct MemoryDirectory {
    pub administrators: std::sync::Mutex<std::collections::HashMap<UserId, Administrator>>,
    pub accounts: std::sync::Mutex<std::collections::HashMap<AccountId, Account>>,
    pub operator_grants: std::sync::Mutex<Vec<OperatorGrant>>,
    pub login_hosts: std::sync::Mutex<Vec<LoginHost>>,
    pub servers: std::sync::Mutex<Vec<Server>>,
    pub replications: std::sync::Mutex<Vec<ServerReplication>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts
            .lock()
            .expect("accounts mutex poisoned")
            .insert(account.account_id.clone(), account);
    }

    pub fn insert_administrator(&self, administrator: Administrator) {
        self.administrators
            .lock()
            .expect("administrators mutex poisoned")
            .insert(administrator.username.clone(), administrator);
    }

    pub fn insert_operator_grant(&self, grant: OperatorGrant) {
        self.operator_grants
            .lock()
            .expect("operator_grants mutex poisoned")
            .push(grant);
    }

    pub fn insert_login_host(&self, login_host: LoginHost) {
        self.login_hosts
            .lock()
            .expect("login_hosts mutex poisoned")
            .push(login_host);
    }

    pub fn insert_server(&self, server: Server) {
        self.servers
            .lock()
            .expect("servers mutex poisoned")
            .push(server);
    }

    pub fn insert_replication(&self, replication: ServerReplication) {
        self.replications
            .lock()
            .expect("replications mutex poisoned")
            .push(replication);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_administrator(
        &self,
        username: &UserId,
    ) -> Result<Option<Administrator>, anyhow::Error> {
        let found = self
            .administrators
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .get(username)
            .cloned();
        Ok(found)
    }

    async fn load_administrators(&self) -> Result<Vec<Administrator>, anyhow::Error> {
        let all = self
            .administrators
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .values()
            .cloned()
            .collect();
        Ok(all)
    }

    async fn load_operator_grants(&self) -> Result<Vec<OperatorGrant>, anyhow::Error> {
        let active = self
            .operator_grants
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .iter()
            .filter(|g| g.is_active())
            .cloned()
            .collect();
        Ok(active)
    }

    async fn load_login_hosts(&self) -> Result<Vec<LoginHost>, anyhow::Error> {
        let all = self
            .login_hosts
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .clone();
        Ok(all)
    }

    async fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, anyhow::Error> {
        let found = self
            .accounts
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .get(account_id)
            .cloned();
        Ok(found)
    }

    async fn child_accounts(&self, account_id: &AccountId) -> Result<Vec<Account>, anyhow::Error> {
        let mut children: Vec<Account> = self
            .accounts
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .values()
            .filter(|a| a.parent_account_id.as_ref() == Some(account_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(children)
    }

    async fn load_servers(&self) -> Result<Vec<Server>, anyhow::Error> {
        let all = self
            .servers
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .clone();
        Ok(all)
    }

    async fn load_server_replications(&self) -> Result<Vec<ServerReplication>, anyhow::Error> {
        let all = self
            .replications
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory directory mutex poisoned: {}", e))?
            .clone();
        Ok(all)
    }
}
