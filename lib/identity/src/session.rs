//! Session attribute storage and the per-session identity cache.
//!
//! A session is an opaque id handed out by the web layer. Each session owns
//! a bag of named JSON attributes; nothing stored under one session is
//! visible from another.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::AuthenticationContext;
use crate::identity::Identity;

/// Session attribute holding the resolved identity.
pub const IDENTITY_ATTRIBUTE: &str = "identity";

/// Session attribute holding the provider authentication context.
pub const AUTHENTICATION_ATTRIBUTE: &str = "authentication";

/// Unique identifier for a session.
///
/// Session ids are opaque strings generated by the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-session attribute storage provided by the surrounding web layer.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads an attribute.
    async fn get_attribute(&self, session: &SessionId, name: &str) -> Option<Value>;

    /// Writes an attribute, replacing any previous value.
    async fn set_attribute(&self, session: &SessionId, name: &str, value: Value);

    /// Removes an attribute, returning the old value.
    async fn remove_attribute(&self, session: &SessionId, name: &str) -> Option<Value>;

    /// Drops every attribute of the session.
    async fn invalidate(&self, session: &SessionId);
}

/// Idle time after which an in-memory session is discarded.
pub const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 30;

#[derive(Debug)]
struct SessionEntry {
    attributes: HashMap<String, Value>,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session store.
///
/// Every access pushes a session's expiry out by the idle timeout. Expired
/// sessions read as empty and are dropped on access or by
/// [`purge_expired`](Self::purge_expired).
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES))
    }
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the number of sessions holding at least one attribute.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no session holds any attribute.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now));
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_attribute(&self, session: &SessionId, name: &str) -> Option<Value> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session)?;
        if entry.is_expired(now) {
            sessions.remove(session);
            return None;
        }
        entry.expires_at = now + self.idle_timeout;
        entry.attributes.get(name).cloned()
    }

    async fn set_attribute(&self, session: &SessionId, name: &str, value: Value) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session.clone()).or_insert_with(|| SessionEntry {
            attributes: HashMap::new(),
            expires_at: now,
        });
        if entry.is_expired(now) {
            entry.attributes.clear();
        }
        entry.expires_at = now + self.idle_timeout;
        entry.attributes.insert(name.to_string(), value);
    }

    async fn remove_attribute(&self, session: &SessionId, name: &str) -> Option<Value> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session)?;
        if entry.is_expired(Utc::now()) {
            sessions.remove(session);
            return None;
        }
        let removed = entry.attributes.remove(name);
        if entry.attributes.is_empty() {
            sessions.remove(session);
        }
        removed
    }

    async fn invalidate(&self, session: &SessionId) {
        self.sessions.write().await.remove(session);
    }
}

/// Reads the authentication context stored for `session`.
///
/// A stored value that no longer decodes reads as absent.
pub async fn load_authentication(
    sessions: &dyn SessionStore,
    session: &SessionId,
) -> Option<AuthenticationContext> {
    let value = sessions
        .get_attribute(session, AUTHENTICATION_ATTRIBUTE)
        .await?;
    match serde_json::from_value(value) {
        Ok(authentication) => Some(authentication),
        Err(e) => {
            tracing::warn!(session = %session, error = %e, "ignoring undecodable authentication context");
            None
        }
    }
}

/// Writes the authentication context for `session`.
///
/// # Errors
///
/// Returns the serialization error if the context cannot be encoded.
pub async fn store_authentication(
    sessions: &dyn SessionStore,
    session: &SessionId,
    authentication: &AuthenticationContext,
) -> Result<(), serde_json::Error> {
    let value = serde_json::to_value(authentication)?;
    sessions
        .set_attribute(session, AUTHENTICATION_ATTRIBUTE, value)
        .await;
    Ok(())
}

/// Caches the resolved identity in the session's own attributes.
#[derive(Clone)]
pub struct SessionIdentityCache {
    store: Arc<dyn SessionStore>,
}

impl SessionIdentityCache {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Returns the session store backing the cache.
    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Returns the identity cached for `session`, if any.
    ///
    /// A cached value that no longer decodes is treated as absent.
    pub async fn lookup(&self, session: &SessionId) -> Option<Identity> {
        let value = self.store.get_attribute(session, IDENTITY_ATTRIBUTE).await?;
        match serde_json::from_value(value) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(session = %session, error = %e, "ignoring undecodable cached identity");
                None
            }
        }
    }

    /// Associates `identity` with `session`, replacing any previous one.
    pub async fn store(&self, session: &SessionId, identity: &Identity) {
        match serde_json::to_value(identity) {
            Ok(value) => {
                self.store
                    .set_attribute(session, IDENTITY_ATTRIBUTE, value)
                    .await;
            }
            Err(e) => {
                tracing::error!(session = %session, error = %e, "failed to encode identity for session");
            }
        }
    }
}

impl std::fmt::Debug for SessionIdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentityCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NewIdentity;
    use crate::provider::Provider;
    use serde_json::json;
    use social_login_core::IdentityId;

    fn identity(email: &str) -> Identity {
        NewIdentity::new(
            Provider::Google,
            "Ann".to_string(),
            email.to_string(),
            "42".to_string(),
        )
        .expect("valid candidate")
        .into_identity(IdentityId::new())
    }

    #[test]
    fn session_id_conversions() {
        let from_str: SessionId = "sess_1".into();
        let from_string: SessionId = "sess_1".to_string().into();
        assert_eq!(from_str, from_string);
        assert_eq!(from_str.as_str(), "sess_1");
        assert_eq!(from_str.to_string(), "sess_1");
    }

    #[tokio::test]
    async fn attributes_are_scoped_to_their_session() {
        let store = InMemorySessionStore::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");

        store.set_attribute(&a, "k", json!(1)).await;

        assert_eq!(store.get_attribute(&a, "k").await, Some(json!(1)));
        assert_eq!(store.get_attribute(&b, "k").await, None);
    }

    #[tokio::test]
    async fn remove_and_invalidate() {
        let store = InMemorySessionStore::new();
        let session = SessionId::from("s");

        store.set_attribute(&session, "x", json!("one")).await;
        store.set_attribute(&session, "y", json!("two")).await;

        assert_eq!(store.remove_attribute(&session, "x").await, Some(json!("one")));
        assert_eq!(store.get_attribute(&session, "x").await, None);
        assert_eq!(store.len().await, 1);

        store.invalidate(&session).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = InMemorySessionStore::with_idle_timeout(Duration::zero());
        let session = SessionId::from("s");

        store.set_attribute(&session, "k", json!(1)).await;

        assert_eq!(store.get_attribute(&session, "k").await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_attributes_do_not_survive_a_new_write() {
        let store = InMemorySessionStore::with_idle_timeout(Duration::zero());
        let session = SessionId::from("s");

        store.set_attribute(&session, "old", json!(1)).await;
        store.set_attribute(&session, "new", json!(2)).await;

        let sessions = store.sessions.read().await;
        let entry = sessions.get(&session).expect("entry");
        assert!(!entry.attributes.contains_key("old"));
    }

    #[tokio::test]
    async fn purge_drops_only_expired_sessions() {
        let expired = InMemorySessionStore::with_idle_timeout(Duration::zero());
        expired.set_attribute(&SessionId::from("a"), "k", json!(1)).await;
        expired.set_attribute(&SessionId::from("b"), "k", json!(2)).await;
        assert_eq!(expired.purge_expired().await, 2);
        assert!(expired.is_empty().await);

        let live = InMemorySessionStore::new();
        live.set_attribute(&SessionId::from("a"), "k", json!(1)).await;
        assert_eq!(live.purge_expired().await, 0);
        assert_eq!(live.get_attribute(&SessionId::from("a"), "k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn cache_round_trips_identity() {
        let cache = SessionIdentityCache::new(Arc::new(InMemorySessionStore::new()));
        let session = SessionId::from("s");
        let ann = identity("ann@x.com");

        assert!(cache.lookup(&session).await.is_none());
        cache.store(&session, &ann).await;
        assert_eq!(cache.lookup(&session).await, Some(ann));
    }

    #[tokio::test]
    async fn cache_store_overwrites_previous_identity() {
        let cache = SessionIdentityCache::new(Arc::new(InMemorySessionStore::new()));
        let session = SessionId::from("s");

        cache.store(&session, &identity("ann@x.com")).await;
        let bo = identity("bo@y.com");
        cache.store(&session, &bo).await;

        assert_eq!(cache.lookup(&session).await, Some(bo));
    }

    #[tokio::test]
    async fn undecodable_cached_value_reads_as_absent() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = SessionId::from("s");
        store
            .set_attribute(&session, IDENTITY_ATTRIBUTE, json!({"not": "an identity"}))
            .await;

        let cache = SessionIdentityCache::new(store);
        assert!(cache.lookup(&session).await.is_none());
    }
}
