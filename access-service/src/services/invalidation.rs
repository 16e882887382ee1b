//! Invalidation aggregation and fan-out.
//!
//! Every mutation records which entity kinds it touched, scoped by
//! account and server where the change is attributable. The aggregate
//! lives inside one unit of work, is snapshotted after the caller
//! commits, and the snapshot is handed to every registered sink.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AccountId, EntityKind, ServerId};

/// A set that can be widened to "everything".
///
/// Widening is monotonic: once widened, specific values are ignored and
/// the set stays the wildcard until cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidenSet<T: Ord> {
    all: bool,
    items: BTreeSet<T>,
}

impl<T: Ord> Default for WidenSet<T> {
    fn default() -> Self {
        Self {
            all: false,
            items: BTreeSet::new(),
        }
    }
}

impl<T: Ord> WidenSet<T> {
    pub fn insert(&mut self, item: T) {
        if !self.all {
            self.items.insert(item);
        }
    }

    pub fn widen(&mut self) {
        self.all = true;
        self.items.clear();
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.items.is_empty()
    }

    /// `None` when widened, otherwise the specific values.
    pub fn as_option(&self) -> Option<&BTreeSet<T>> {
        if self.all {
            None
        } else {
            Some(&self.items)
        }
    }
}

/// Accumulated scope for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindAggregate {
    pub accounts: WidenSet<AccountId>,
    pub servers: WidenSet<ServerId>,
}

/// Per-unit-of-work collector of affected entity kinds.
///
/// Not shared across requests; each unit of work owns exactly one.
#[derive(Debug, Default)]
pub struct InvalidationAggregator {
    entries: BTreeMap<EntityKind, KindAggregate>,
}

impl InvalidationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one affected combination. `None` for a dimension means
    /// the change is not attributable to specific values there, so the
    /// dimension widens to the wildcard.
    pub fn add(
        &mut self,
        kind: EntityKind,
        account: Option<&AccountId>,
        server: Option<&ServerId>,
    ) {
        let entry = self.entries.entry(kind).or_default();
        match account {
            Some(account) => entry.accounts.insert(account.clone()),
            None => entry.accounts.widen(),
        }
        match server {
            Some(server) => entry.servers.insert(server.clone()),
            None => entry.servers.widen(),
        }
    }

    pub fn add_all_accounts(&mut self, kind: EntityKind) {
        self.entries.entry(kind).or_default().accounts.widen();
    }

    pub fn add_all_servers(&mut self, kind: EntityKind) {
        self.entries.entry(kind).or_default().servers.widen();
    }

    /// Widen both dimensions for a kind.
    pub fn add_all(&mut self, kind: EntityKind) {
        let entry = self.entries.entry(kind).or_default();
        entry.accounts.widen();
        entry.servers.widen();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn affected(&self, kind: EntityKind) -> Option<&KindAggregate> {
        self.entries.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.entries.keys().copied()
    }

    /// Freeze the aggregate into the value handed to sinks.
    pub fn snapshot(&self, unit_id: Uuid) -> InvalidationSnapshot {
        let entries = self
            .entries
            .iter()
            .map(|(kind, aggregate)| {
                (
                    *kind,
                    KindInvalidation {
                        accounts: aggregate.accounts.as_option().cloned(),
                        servers: aggregate.servers.as_option().cloned(),
                    },
                )
            })
            .collect();
        InvalidationSnapshot { unit_id, entries }
    }
}

/// Affected scope for one kind in a snapshot. `None` means the
/// wildcard: every value in that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindInvalidation {
    pub accounts: Option<BTreeSet<AccountId>>,
    pub servers: Option<BTreeSet<ServerId>>,
}

/// Immutable record of what one completed unit of work touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationSnapshot {
    unit_id: Uuid,
    entries: BTreeMap<EntityKind, KindInvalidation>,
}

impl InvalidationSnapshot {
    pub fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    pub fn touches(&self, kind: EntityKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn get(&self, kind: EntityKind) -> Option<&KindInvalidation> {
        self.entries.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &KindInvalidation)> {
        self.entries.iter().map(|(kind, inv)| (*kind, inv))
    }
}

/// Consumer of completed-unit snapshots: remote caches, daemon
/// notifiers, audit trails.
#[async_trait]
pub trait InvalidationSink: Send + Sync {
    async fn publish(&self, snapshot: &InvalidationSnapshot) -> Result<(), anyhow::Error>;
}

/// Fan-out point for snapshots.
///
/// Publish happens after the unit's own transaction has committed, so a
/// failing sink cannot roll anything back; failures are logged and the
/// remaining sinks still run.
#[derive(Default)]
pub struct InvalidationBroker {
    sinks: RwLock<Vec<Arc<dyn InvalidationSink>>>,
}

impl InvalidationBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn InvalidationSink>) {
        self.sinks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub async fn publish(&self, snapshot: &InvalidationSnapshot) {
        let sinks: Vec<Arc<dyn InvalidationSink>> = self
            .sinks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for sink in sinks {
            if let Err(e) = sink.publish(snapshot).await {
                tracing::error!(
                    unit_id = %snapshot.unit_id(),
                    error = %e,
                    "invalidation sink failed"
                );
            }
        }
    }
}

// ==================== Mock Sink for Testing ====================

/// Records every snapshot it receives.
#[derive(Default)]
pub struct MemorySink {
    pub received: std::sync::Mutex<Vec<InvalidationSnapshot>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<InvalidationSnapshot> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl InvalidationSink for MemorySink {
    async fn publish(&self, snapshot: &InvalidationSnapshot) -> Result<(), anyhow::Error> {
        self.received
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory sink mutex poisoned: {}", e))?
            .push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kind;

    #[test]
    fn test_add_records_specific_pairs() {
        let mut agg = InvalidationAggregator::new();
        agg.add(
            kind::DNS_ZONES,
            Some(&AccountId::new("child_sub")),
            Some(&ServerId::new("web-1")),
        );

        let affected = agg.affected(kind::DNS_ZONES).expect("kind recorded");
        assert!(!affected.accounts.is_all());
        assert_eq!(
            affected.accounts.as_option().unwrap(),
            &BTreeSet::from([AccountId::new("child_sub")])
        );
        assert_eq!(
            affected.servers.as_option().unwrap(),
            &BTreeSet::from([ServerId::new("web-1")])
        );
        assert!(agg.affected(kind::SITES).is_none());
    }

    #[test]
    fn test_specific_values_accumulate() {
        let mut agg = InvalidationAggregator::new();
        agg.add(
            kind::DNS_ZONES,
            Some(&AccountId::new("child_sub")),
            Some(&ServerId::new("web-1")),
        );
        agg.add(
            kind::DNS_ZONES,
            Some(&AccountId::new("other_child")),
            Some(&ServerId::new("db-1")),
        );

        let affected = agg.affected(kind::DNS_ZONES).expect("kind recorded");
        assert!(!affected.accounts.is_all());
        assert_eq!(
            affected.accounts.as_option().unwrap(),
            &BTreeSet::from([AccountId::new("child_sub"), AccountId::new("other_child")])
        );
        assert_eq!(
            affected.servers.as_option().unwrap(),
            &BTreeSet::from([ServerId::new("db-1"), ServerId::new("web-1")])
        );
    }

    #[test]
    fn test_none_widens_a_dimension() {
        let mut agg = InvalidationAggregator::new();
        agg.add(kind::SITES, None, Some(&ServerId::new("web-1")));

        let affected = agg.affected(kind::SITES).unwrap();
        assert!(affected.accounts.is_all());
        assert_eq!(
            affected.servers.as_option().unwrap(),
            &BTreeSet::from([ServerId::new("web-1")])
        );
    }

    #[test]
    fn test_widening_is_monotonic() {
        let mut agg = InvalidationAggregator::new();
        agg.add_all_accounts(kind::ACCOUNTS);
        agg.add(
            kind::ACCOUNTS,
            Some(&AccountId::new("child_sub")),
            Some(&ServerId::new("web-1")),
        );

        let affected = agg.affected(kind::ACCOUNTS).unwrap();
        assert!(affected.accounts.is_all());
        assert!(affected.accounts.as_option().is_none());
        // The server dimension was never widened and keeps its value.
        assert_eq!(affected.servers.as_option().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut agg = InvalidationAggregator::new();
        agg.add_all(kind::SERVERS);
        assert!(!agg.is_empty());

        agg.clear();
        assert!(agg.is_empty());
        assert!(agg.affected(kind::SERVERS).is_none());
    }

    #[test]
    fn test_snapshot_serializes_wildcard_as_null() {
        let mut agg = InvalidationAggregator::new();
        agg.add(kind::SITES, None, Some(&ServerId::new("web-1")));
        let snapshot = agg.snapshot(Uuid::new_v4());

        let json = serde_json::to_value(&snapshot).unwrap();
        let sites = &json["entries"]["sites"];
        assert!(sites["accounts"].is_null());
        assert_eq!(sites["servers"][0], "web-1");
    }

    #[test]
    fn test_snapshot_touches_only_recorded_kinds() {
        let mut agg = InvalidationAggregator::new();
        agg.add_all(kind::ADMINISTRATORS);
        let snapshot = agg.snapshot(Uuid::new_v4());

        assert!(snapshot.touches(kind::ADMINISTRATORS));
        assert!(!snapshot.touches(kind::OPERATOR_GRANTS));
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.iter().count(), 1);
    }

    struct FailingSink;

    #[async_trait]
    impl InvalidationSink for FailingSink {
        async fn publish(&self, _snapshot: &InvalidationSnapshot) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("sink offline"))
        }
    }

    #[tokio::test]
    async fn test_broker_fans_out_past_failing_sinks() {
        let broker = InvalidationBroker::new();
        let healthy = Arc::new(MemorySink::new());
        broker.register(Arc::new(FailingSink));
        broker.register(healthy.clone());
        assert_eq!(broker.sink_count(), 2);

        let mut agg = InvalidationAggregator::new();
        agg.add_all(kind::LOGIN_HOSTS);
        let snapshot = agg.snapshot(Uuid::new_v4());
        broker.publish(&snapshot).await;

        let received = healthy.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], snapshot);
    }
}
