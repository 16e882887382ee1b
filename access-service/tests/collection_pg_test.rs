//! Collection tests against live PostgreSQL: tier row-sets served by
//! the real queries, and the zone removal flow end to end.
//!
//! Run with: TEST_DATABASE_URL=postgres://... cargo test -- --ignored

mod common;

use access_service::collections::{
    primary_column, ColumnValue, EntityCollection, DNS_ZONE_COLUMNS,
};
use access_service::models::kind;

use common::*;

/// A privileged login sees every server and every zone, whoever owns
/// them. Containment asserts only: the tables are shared with worlds
/// seeded by concurrent tests.
#[tokio::test]
#[ignore] // Requires database - set TEST_DATABASE_URL
async fn test_privileged_sees_full_sets() {
    let state = pg_state().await;
    let world = seed_pg_world(&state).await;
    let session = login_as(&state, world.privileged_user.as_str()).await;

    let viewer = state
        .viewer(&session, state.servers.scoped_rule())
        .await
        .expect("build server viewer");
    let servers = state
        .servers
        .rows(&state.pool, &viewer)
        .await
        .expect("list servers");
    let server_ids: Vec<_> = servers.into_iter().map(|s| s.server_id).collect();
    for expected in [
        &world.db_server,
        &world.web_server,
        &world.edge_server,
        &world.backup_server,
    ] {
        assert!(
            server_ids.contains(expected),
            "full set should carry {}",
            expected
        );
    }

    let viewer = state
        .viewer(&session, state.dns_zones.scoped_rule())
        .await
        .expect("build zone viewer");
    let zones = state
        .dns_zones
        .rows(&state.pool, &viewer)
        .await
        .expect("list zones");
    let zone_ids: Vec<_> = zones.into_iter().map(|z| z.zone_id).collect();
    for expected in [&world.root_zone, &world.child_zone, &world.stranger_zone] {
        assert!(
            zone_ids.contains(expected),
            "full set should carry {}",
            expected
        );
    }
}

/// One grant on the web server: the server set expands to the failover
/// parent, the failover child, and the replication target, while zones
/// stay on the granted server alone.
#[tokio::test]
#[ignore]
async fn test_scoped_reach_follows_the_collection_rule() {
    let state = pg_state().await;
    let world = seed_pg_world(&state).await;
    let session = login_as(&state, world.scoped_user.as_str()).await;

    let viewer = state
        .viewer(&session, state.servers.scoped_rule())
        .await
        .expect("build server viewer");
    let servers = state
        .servers
        .rows(&state.pool, &viewer)
        .await
        .expect("list servers");
    let mut server_ids: Vec<_> = servers.into_iter().map(|s| s.server_id).collect();
    server_ids.sort();
    let mut expected = vec![
        world.db_server.clone(),
        world.web_server.clone(),
        world.edge_server.clone(),
        world.backup_server.clone(),
    ];
    expected.sort();
    assert_eq!(server_ids, expected);

    let viewer = state
        .viewer(&session, state.dns_zones.scoped_rule())
        .await
        .expect("build zone viewer");
    let zones = state
        .dns_zones
        .rows(&state.pool, &viewer)
        .await
        .expect("list zones");
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].zone_id, world.child_zone);
}

/// A tenant owner on the child account sees zones across its account
/// line and the bind reached through the owned site; the stranger's
/// zone stays invisible.
#[tokio::test]
#[ignore]
async fn test_tenant_sees_its_account_line_only() {
    let state = pg_state().await;
    let world = seed_pg_world(&state).await;
    let session = login_as(&state, world.owner_user.as_str()).await;

    let viewer = state
        .viewer(&session, state.dns_zones.scoped_rule())
        .await
        .expect("build zone viewer");
    let zones = state
        .dns_zones
        .rows(&state.pool, &viewer)
        .await
        .expect("list zones");
    let mut zone_ids: Vec<_> = zones.into_iter().map(|z| z.zone_id).collect();
    zone_ids.sort();
    let mut expected = vec![world.child_zone.clone(), world.root_zone.clone()];
    expected.sort();
    assert_eq!(zone_ids, expected);

    let viewer = state
        .viewer(&session, state.site_binds.scoped_rule())
        .await
        .expect("build bind viewer");
    let binds = state
        .site_binds
        .rows(&state.pool, &viewer)
        .await
        .expect("list binds");
    assert_eq!(binds.len(), 1);
    assert_eq!(binds[0].bind_id, world.bind_id);
}

/// Removing a zone deletes the row and records the owning account and
/// serving host on the unit of work, and the completed snapshot carries
/// the kind.
#[tokio::test]
#[ignore]
async fn test_remove_zone_deletes_and_records_invalidations() {
    let state = pg_state().await;
    let world = seed_pg_world(&state).await;
    let session = login_as(&state, world.owner_user.as_str()).await;

    let viewer = state
        .viewer(&session, state.dns_zones.scoped_rule())
        .await
        .expect("build zone viewer");
    let mut unit = state.begin_unit(session);

    state
        .dns_zones
        .remove(&state.pool, &viewer, &mut unit, &world.child_zone)
        .await
        .expect("remove zone");

    let affected = unit
        .invalidations
        .affected(kind::DNS_ZONES)
        .expect("removal recorded");
    assert!(affected
        .accounts
        .as_option()
        .expect("specific accounts")
        .contains(&world.child_account));
    assert!(affected
        .servers
        .as_option()
        .expect("specific servers")
        .contains(&world.web_server));

    let key = primary_column(DNS_ZONE_COLUMNS).expect("zones declare a primary column");
    let gone = state
        .dns_zones
        .find_unique(
            &state.pool,
            &viewer,
            key.name,
            &ColumnValue::Text(world.child_zone.clone()),
        )
        .await
        .expect("lookup removed zone");
    assert!(gone.is_none());

    let snapshot = state.complete_unit(unit).await;
    assert!(snapshot.touches(kind::DNS_ZONES));
}
