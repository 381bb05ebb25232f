//! The identity store contract and an in-memory implementation.
//!
//! Implementations must guarantee at most one identity per email even when
//! `create` is called concurrently for the same address. The loser of such a
//! race receives `StoreError::EmailConflict`; callers re-fetch and adopt the
//! winner.

use async_trait::async_trait;
use social_login_core::{IdentityId, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::identity::{Identity, NewIdentity};

/// Persistent storage for identities, keyed by email.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Finds the identity registered for `email`.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Persists a candidate, assigning its id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::EmailConflict` if the email is already taken and
    /// `StoreError::Unavailable` if the store cannot be reached.
    async fn create(&self, candidate: NewIdentity) -> Result<Identity, StoreError>;
}

/// In-memory identity store.
///
/// A single mutex makes the check-then-insert in `create` atomic.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    by_email: Mutex<HashMap<String, Identity>>,
}

impl InMemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored identities.
    pub async fn len(&self) -> usize {
        self.by_email.lock().await.len()
    }

    /// Returns true if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.by_email.lock().await.is_empty()
    }

    /// Returns a snapshot of every stored identity.
    pub async fn identities(&self) -> Vec<Identity> {
        self.by_email.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.by_email.lock().await.get(email).cloned())
    }

    async fn create(&self, candidate: NewIdentity) -> Result<Identity, StoreError> {
        let mut by_email = self.by_email.lock().await;
        if by_email.contains_key(candidate.email()) {
            return Err(StoreError::EmailConflict {
                email: candidate.email().to_string(),
            }
            .into());
        }

        let identity = candidate.into_identity(IdentityId::new());
        by_email.insert(identity.email().to_string(), identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    fn candidate(provider: Provider, email: &str) -> NewIdentity {
        NewIdentity::new(provider, "Ann".to_string(), email.to_string(), "42".to_string())
            .expect("valid candidate")
    }

    #[tokio::test]
    async fn create_assigns_id_and_preserves_created_at() {
        let store = InMemoryIdentityStore::new();
        let new = candidate(Provider::Google, "ann@x.com");
        let created_at = new.created_at();

        let identity = store.create(new).await.expect("create");

        assert_eq!(identity.created_at(), created_at);
        assert_eq!(
            store.find_by_email("ann@x.com").await.expect("find"),
            Some(identity)
        );
    }

    #[tokio::test]
    async fn find_by_unknown_email_is_none() {
        let store = InMemoryIdentityStore::new();
        assert_eq!(store.find_by_email("nobody@x.com").await.expect("find"), None);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryIdentityStore::new();
        store
            .create(candidate(Provider::Google, "ann@x.com"))
            .await
            .expect("first create");

        let err = store
            .create(candidate(Provider::Kakao, "ann@x.com"))
            .await
            .expect_err("second create must conflict");

        assert_eq!(
            err.current_context(),
            &StoreError::EmailConflict {
                email: "ann@x.com".to_string()
            }
        );
        assert_eq!(store.len().await, 1);
        let stored = store.identities().await;
        assert_eq!(stored[0].provider(), Provider::Google);
    }
}
