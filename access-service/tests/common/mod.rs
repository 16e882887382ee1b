//! Common test utilities for access-service integration tests.
//!
//! Most suites run against `MemoryDirectory` and a lazily-connected
//! pool. The `pg_*` helpers back the ignored suites that need the live
//! database named by `TEST_DATABASE_URL`.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use sha2::{Digest, Sha256};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use access_service::config::{
    AccessConfig, DatabaseConfig, Environment, HierarchyConfig, SessionConfig,
};
use access_service::models::{
    Account, AccountId, Administrator, LoginHost, OperatorGrant, Server, ServerId,
    ServerReplication, UserId,
};
use access_service::services::{LoginRequest, MemoryDirectory, Session};
use access_service::utils::{hash_credential, Credential};
use access_service::AccessState;
use platform_core::config::Config as CommonConfig;

static INIT: Once = Once::new();

/// Credential shared by every seeded identity with an Argon2id hash.
pub const TEST_CREDENTIAL: &str = "open-sesame-7";
/// Credential behind the seeded legacy SHA-256 identity.
pub const LEGACY_CREDENTIAL: &str = "legacy-tide-9";
/// Host every unrestricted login in the suite originates from.
pub const TEST_HOST: &str = "console.example.com";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,access_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config() -> AccessConfig {
    AccessConfig {
        common: CommonConfig {
            port: 8080,
            log_level: "debug".to_string(),
        },
        environment: Environment::Dev,
        service_name: "access-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost/access_test".to_string(),
            max_connections: 2,
            min_connections: 1,
        },
        hierarchy: HierarchyConfig { max_depth: 64 },
        session: SessionConfig {
            idle_ttl_seconds: 1800,
            max_entries: 64,
        },
    }
}

pub fn admin(username: &str, account: &str, hash: Option<String>) -> Administrator {
    let mut a = Administrator::new(UserId::new(username), AccountId::new(account));
    a.credential_hash = hash;
    a
}

/// Directory fixture shared by the suite.
///
/// Accounts: `root_corp` with children `child_sub` and `other_child`,
/// plus the unrelated `other_org`. Fleet: `web-1` fails over to
/// `db-1`, `web-2` fails over to `web-1`, and `web-1` replicates to
/// `backup-1`. Identities cover every tier and every login edge:
/// privileged `root_admin`, scoped `ops_scoped` (grant on `web-1`),
/// tenants `owner_root`/`owner_child`/`owner_other`, delegators
/// `delegate_boss` (root) and `delegate_child` (mid-tree), plus
/// `disabled_dan`, `no_hash_nick`, `legacy_lee`, and the host-bound
/// `host_bound`.
pub fn seeded_directory() -> Arc<MemoryDirectory> {
    let dir = Arc::new(MemoryDirectory::new());

    dir.insert_account(Account::new(AccountId::new("root_corp"), None));
    dir.insert_account(Account::new(
        AccountId::new("child_sub"),
        Some(AccountId::new("root_corp")),
    ));
    dir.insert_account(Account::new(
        AccountId::new("other_child"),
        Some(AccountId::new("root_corp")),
    ));
    dir.insert_account(Account::new(AccountId::new("other_org"), None));

    let hash = hash_credential(&Credential::new(TEST_CREDENTIAL))
        .expect("hash test credential")
        .into_string();

    dir.insert_administrator(admin("root_admin", "root_corp", Some(hash.clone())));
    dir.insert_administrator(admin("ops_scoped", "root_corp", Some(hash.clone())));
    dir.insert_administrator(admin("owner_root", "root_corp", Some(hash.clone())));
    dir.insert_administrator(admin("owner_child", "child_sub", Some(hash.clone())));
    dir.insert_administrator(admin("owner_other", "other_child", Some(hash.clone())));

    let mut boss = admin("delegate_boss", "root_corp", Some(hash.clone()));
    boss.can_delegate_flag = true;
    dir.insert_administrator(boss);

    let mut mid = admin("delegate_child", "child_sub", Some(hash.clone()));
    mid.can_delegate_flag = true;
    dir.insert_administrator(mid);

    let mut dan = admin("disabled_dan", "child_sub", Some(hash.clone()));
    dan.disabled_flag = true;
    dir.insert_administrator(dan);

    dir.insert_administrator(admin("no_hash_nick", "root_corp", None));

    // Identity still on the legacy hex SHA-256 format.
    let legacy = hex::encode(Sha256::digest(LEGACY_CREDENTIAL.as_bytes()));
    dir.insert_administrator(admin("legacy_lee", "root_corp", Some(legacy)));

    dir.insert_administrator(admin("host_bound", "root_corp", Some(hash)));
    dir.insert_login_host(LoginHost::new(UserId::new("host_bound"), "Desk.Example.COM"));
    dir.insert_login_host(LoginHost::new(UserId::new("host_bound"), "ops.example.com"));

    dir.insert_server(Server::new(ServerId::new("db-1"), "east"));
    dir.insert_server(
        Server::new(ServerId::new("web-1"), "east").with_failover_parent(ServerId::new("db-1")),
    );
    dir.insert_server(
        Server::new(ServerId::new("web-2"), "east").with_failover_parent(ServerId::new("web-1")),
    );
    dir.insert_server(Server::new(ServerId::new("backup-1"), "east"));
    dir.insert_replication(ServerReplication::new(
        ServerId::new("web-1"),
        ServerId::new("backup-1"),
    ));

    dir.insert_operator_grant(OperatorGrant::new(UserId::new("root_admin"), None));
    dir.insert_operator_grant(OperatorGrant::new(
        UserId::new("ops_scoped"),
        Some(ServerId::new("web-1")),
    ));

    dir
}

/// Build an `AccessState` over the seeded directory.
pub fn spawn_state() -> AccessState {
    init_tracing();
    let pool = PgPool::connect_lazy("postgres://localhost/access_test").expect("lazy pool");
    AccessState::with_directory(test_config(), pool, seeded_directory())
}

/// Build an `AccessState` over a caller-provided directory.
pub fn spawn_state_with(directory: Arc<MemoryDirectory>) -> AccessState {
    init_tracing();
    let pool = PgPool::connect_lazy("postgres://localhost/access_test").expect("lazy pool");
    AccessState::with_directory(test_config(), pool, directory)
}

/// Log a seeded identity in from the default host.
pub async fn login_as(state: &AccessState, username: &str) -> Arc<Session> {
    state
        .login(
            TEST_HOST,
            LoginRequest::direct(UserId::new(username), Credential::new(TEST_CREDENTIAL)),
        )
        .await
        .expect("login should succeed")
}

/// Build an `AccessState` against the live database named by
/// `TEST_DATABASE_URL`, running migrations on the way up.
pub async fn pg_state() -> AccessState {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set - run with cargo test -- --ignored");

    let mut config = test_config();
    config.database.url = database_url;

    AccessState::build(config)
        .await
        .expect("Failed to build access state")
}

/// Identifiers of one world seeded into PostgreSQL.
///
/// Every identifier carries a per-call unique tag, so tests sharing a
/// database can run concurrently and reruns need no cleanup.
pub struct PgWorld {
    pub tag: String,
    pub root_account: AccountId,
    pub child_account: AccountId,
    pub stranger_account: AccountId,
    pub privileged_user: UserId,
    pub scoped_user: UserId,
    pub owner_user: UserId,
    pub db_server: ServerId,
    pub web_server: ServerId,
    pub edge_server: ServerId,
    pub backup_server: ServerId,
    pub root_zone: String,
    pub child_zone: String,
    pub stranger_zone: String,
    pub site_id: Uuid,
    pub bind_id: Uuid,
}

/// Seed the fixture world into PostgreSQL and return its identifiers.
///
/// Shape mirrors `seeded_directory`: a root account with one child plus
/// an unrelated stranger; `web` fails over to `db`, `edge` fails over
/// to `web`, and `web` replicates to `backup`. One identity per tier:
/// privileged (unrestricted grant), scoped (grant on `web`), and a
/// tenant owner on the child account. Hosted entities: one zone per
/// account, `web` and `db` hosting the account line, and one site with
/// a bind on the child.
pub async fn seed_pg_world(state: &AccessState) -> PgWorld {
    let tag = Uuid::new_v4().simple().to_string();
    let hash = hash_credential(&Credential::new(TEST_CREDENTIAL))
        .expect("hash test credential")
        .into_string();

    let world = PgWorld {
        root_account: AccountId::new(format!("root-{}", tag)),
        child_account: AccountId::new(format!("child-{}", tag)),
        stranger_account: AccountId::new(format!("stranger-{}", tag)),
        privileged_user: UserId::new(format!("priv-{}", tag)),
        scoped_user: UserId::new(format!("ops-{}", tag)),
        owner_user: UserId::new(format!("owner-{}", tag)),
        db_server: ServerId::new(format!("db-{}", tag)),
        web_server: ServerId::new(format!("web-{}", tag)),
        edge_server: ServerId::new(format!("edge-{}", tag)),
        backup_server: ServerId::new(format!("backup-{}", tag)),
        root_zone: format!("root-{}.example.com", tag),
        child_zone: format!("child-{}.example.com", tag),
        stranger_zone: format!("stranger-{}.example.com", tag),
        site_id: Uuid::new_v4(),
        bind_id: Uuid::new_v4(),
        tag,
    };

    sqlx::query(
        "INSERT INTO accounts (account_id, parent_account_id) \
         VALUES ($1, NULL), ($2, $1), ($3, NULL)",
    )
    .bind(&world.root_account)
    .bind(&world.child_account)
    .bind(&world.stranger_account)
    .execute(&state.pool)
    .await
    .expect("seed accounts");

    for (username, account) in [
        (&world.privileged_user, &world.root_account),
        (&world.scoped_user, &world.root_account),
        (&world.owner_user, &world.child_account),
    ] {
        sqlx::query(
            "INSERT INTO administrators (username, account_id, credential_hash) \
             VALUES ($1, $2, $3)",
        )
        .bind(username)
        .bind(account)
        .bind(&hash)
        .execute(&state.pool)
        .await
        .expect("seed administrator");
    }

    sqlx::query("INSERT INTO server_farms (farm_id) VALUES ($1)")
        .bind(format!("farm-{}", world.tag))
        .execute(&state.pool)
        .await
        .expect("seed farm");

    // Parents land before the rows that point at them.
    for (server, failover_parent) in [
        (&world.db_server, None),
        (&world.web_server, Some(&world.db_server)),
        (&world.edge_server, Some(&world.web_server)),
        (&world.backup_server, None),
    ] {
        sqlx::query(
            "INSERT INTO servers (server_id, farm_id, failover_parent_id) VALUES ($1, $2, $3)",
        )
        .bind(server)
        .bind(format!("farm-{}", world.tag))
        .bind(failover_parent.cloned())
        .execute(&state.pool)
        .await
        .expect("seed server");
    }

    sqlx::query("INSERT INTO operator_grants (grant_id, username, server_id) VALUES ($1, $2, NULL)")
        .bind(Uuid::new_v4())
        .bind(&world.privileged_user)
        .execute(&state.pool)
        .await
        .expect("seed privileged grant");

    sqlx::query("INSERT INTO operator_grants (grant_id, username, server_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(&world.scoped_user)
        .bind(&world.web_server)
        .execute(&state.pool)
        .await
        .expect("seed scoped grant");

    sqlx::query(
        "INSERT INTO server_replications (replication_id, source_server_id, target_server_id) \
         VALUES ($1, $2, $3)",
    )
    .bind(Uuid::new_v4())
    .bind(&world.web_server)
    .bind(&world.backup_server)
    .execute(&state.pool)
    .await
    .expect("seed replication");

    for (account, server) in [
        (&world.child_account, &world.web_server),
        (&world.root_account, &world.db_server),
    ] {
        sqlx::query("INSERT INTO account_hosts (account_id, server_id) VALUES ($1, $2)")
            .bind(account)
            .bind(server)
            .execute(&state.pool)
            .await
            .expect("seed account host");
    }

    for (zone, account, server) in [
        (&world.root_zone, &world.root_account, &world.db_server),
        (&world.child_zone, &world.child_account, &world.web_server),
        (
            &world.stranger_zone,
            &world.stranger_account,
            &world.backup_server,
        ),
    ] {
        sqlx::query("INSERT INTO dns_zones (zone_id, account_id, server_id) VALUES ($1, $2, $3)")
            .bind(zone)
            .bind(account)
            .bind(server)
            .execute(&state.pool)
            .await
            .expect("seed dns zone");
    }

    sqlx::query(
        "INSERT INTO sites (site_id, account_id, server_id, site_name) VALUES ($1, $2, $3, $4)",
    )
    .bind(world.site_id)
    .bind(&world.child_account)
    .bind(&world.web_server)
    .bind(format!("shop-{}", world.tag))
    .execute(&state.pool)
    .await
    .expect("seed site");

    sqlx::query(
        "INSERT INTO site_binds (bind_id, site_id, server_id, port) VALUES ($1, $2, $3, $4)",
    )
    .bind(world.bind_id)
    .bind(world.site_id)
    .bind(&world.web_server)
    .bind(8443_i32)
    .execute(&state.pool)
    .await
    .expect("seed site bind");

    world
}
