//! In-process session cache.
//!
//! Sessions are keyed two ways: by the opaque bearer token handed to
//! the caller, and by the identity tuple so a repeated login can reuse
//! a live session instead of minting a new one. Credentials are never
//! part of either key. Entries expire after an idle TTL and the
//! stalest entry is evicted when the cache is full.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;

use crate::models::{AccountId, Locale, ServerId, UserId};
use crate::services::classifier::AccessTier;

/// Opaque bearer token identifying a live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// 32 random bytes, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity tuple a session is deduplicated on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub connect_as: UserId,
    pub authenticate_as: UserId,
    pub server_scope: Option<ServerId>,
    pub read_only: bool,
}

/// A live authenticated session.
///
/// Locale is the only mutable piece of session state; everything else
/// is fixed at login.
#[derive(Debug)]
pub struct Session {
    token: SessionToken,
    connect_as: UserId,
    authenticate_as: UserId,
    account_id: AccountId,
    tier: AccessTier,
    server_scope: Option<ServerId>,
    read_only: bool,
    locale: RwLock<Locale>,
    created_utc: DateTime<Utc>,
    last_used: AtomicI64,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token: SessionToken,
        connect_as: UserId,
        authenticate_as: UserId,
        account_id: AccountId,
        tier: AccessTier,
        server_scope: Option<ServerId>,
        read_only: bool,
        locale: Locale,
    ) -> Self {
        let now = Utc::now();
        Self {
            token,
            connect_as,
            authenticate_as,
            account_id,
            tier,
            server_scope,
            read_only,
            locale: RwLock::new(locale),
            created_utc: now,
            last_used: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn connect_as(&self) -> &UserId {
        &self.connect_as
    }

    pub fn authenticate_as(&self) -> &UserId {
        &self.authenticate_as
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn tier(&self) -> AccessTier {
        self.tier
    }

    pub fn server_scope(&self) -> Option<&ServerId> {
        self.server_scope.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn created_utc(&self) -> DateTime<Utc> {
        self.created_utc
    }

    pub fn locale(&self) -> Locale {
        self.locale
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_locale(&self, locale: Locale) {
        *self.locale.write().unwrap_or_else(|e| e.into_inner()) = locale;
    }

    pub fn key(&self) -> SessionKey {
        SessionKey {
            connect_as: self.connect_as.clone(),
            authenticate_as: self.authenticate_as.clone(),
            server_scope: self.server_scope.clone(),
            read_only: self.read_only,
        }
    }

    fn touch(&self) {
        self.last_used
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn last_used_millis(&self) -> i64 {
        self.last_used.load(Ordering::Relaxed)
    }

    fn idle_longer_than(&self, ttl: Duration) -> bool {
        let idle = Utc::now().timestamp_millis() - self.last_used_millis();
        idle > ttl.as_millis() as i64
    }
}

/// Counters exposed for operational visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCacheStats {
    pub live: usize,
    pub expired_total: u64,
    pub evicted_total: u64,
}

pub struct SessionCache {
    ttl: Duration,
    capacity: usize,
    by_token: DashMap<SessionToken, Arc<Session>>,
    by_key: DashMap<SessionKey, SessionToken>,
    expired: AtomicU64,
    evicted: AtomicU64,
}

impl SessionCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            by_token: DashMap::new(),
            by_key: DashMap::new(),
            expired: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn insert(&self, session: Arc<Session>) {
        while self.by_token.len() >= self.capacity {
            if !self.evict_stalest() {
                break;
            }
        }
        let token = session.token().clone();
        if let Some(old) = self.by_key.insert(session.key(), token.clone()) {
            if old != token {
                self.by_token.remove(&old);
            }
        }
        self.by_token.insert(token, session);
    }

    /// Look up a session by token, expiring it if idle past the TTL.
    pub fn find(&self, token: &SessionToken) -> Option<Arc<Session>> {
        let session = self.by_token.get(token).map(|s| s.clone())?;
        if session.idle_longer_than(self.ttl) {
            self.drop_session(&session);
            self.expired.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        session.touch();
        Some(session)
    }

    /// Look up a live session for an identity tuple.
    pub fn find_by_key(&self, key: &SessionKey) -> Option<Arc<Session>> {
        let token = self.by_key.get(key).map(|t| t.clone())?;
        self.find(&token)
    }

    pub fn remove(&self, token: &SessionToken) -> Option<Arc<Session>> {
        let (_, session) = self.by_token.remove(token)?;
        self.by_key.remove_if(&session.key(), |_, t| t == token);
        Some(session)
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let stale: Vec<Arc<Session>> = self
            .by_token
            .iter()
            .filter(|entry| entry.value().idle_longer_than(self.ttl))
            .map(|entry| entry.value().clone())
            .collect();
        for session in &stale {
            self.drop_session(session);
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    pub fn stats(&self) -> SessionCacheStats {
        SessionCacheStats {
            live: self.by_token.len(),
            expired_total: self.expired.load(Ordering::Relaxed),
            evicted_total: self.evicted.load(Ordering::Relaxed),
        }
    }

    fn drop_session(&self, session: &Arc<Session>) {
        self.by_token.remove(session.token());
        self.by_key
            .remove_if(&session.key(), |_, t| t == session.token());
    }

    /// Remove the entry idle the longest. Returns false when empty.
    fn evict_stalest(&self) -> bool {
        let stalest = self
            .by_token
            .iter()
            .min_by_key(|entry| entry.value().last_used_millis())
            .map(|entry| entry.value().clone());
        match stalest {
            Some(session) => {
                self.drop_session(&session);
                self.evicted.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}
