//! The canonical identity record and its not-yet-persisted candidate.
//!
//! An identity is created the first time an email address logs in through
//! any provider. Email is the natural key: there is at most one identity per
//! email, whichever provider registered it first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use social_login_core::IdentityId;

use crate::error::NormalizationError;
use crate::provider::Provider;

/// A candidate identity produced by a provider normalizer.
///
/// It has no id yet; the identity store assigns one on creation. The only
/// way to build a candidate is [`NewIdentity::new`], which rejects an empty
/// email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    display_name: String,
    email: String,
    provider_principal: String,
    provider: Provider,
    created_at: DateTime<Utc>,
}

impl NewIdentity {
    /// Creates a candidate stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `NormalizationError::MissingEmail` if `email` is blank.
    /// Surrounding whitespace is stripped from the stored email.
    pub fn new(
        provider: Provider,
        display_name: String,
        email: String,
        provider_principal: String,
    ) -> Result<Self, NormalizationError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(NormalizationError::MissingEmail { provider });
        }

        Ok(Self {
            display_name,
            email: email.to_string(),
            provider_principal,
            provider,
            created_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn provider_principal(&self) -> &str {
        &self.provider_principal
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Turns the candidate into a persisted identity with the given id.
    ///
    /// Intended for identity store implementations. `created_at` is kept and
    /// `updated_at` starts unset.
    #[must_use]
    pub fn into_identity(self, id: IdentityId) -> Identity {
        Identity {
            id,
            display_name: self.display_name,
            email: self.email,
            provider_principal: self.provider_principal,
            provider: self.provider,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// A persisted identity.
///
/// Identities are serialized into the session so later requests can skip
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Store-assigned id.
    id: IdentityId,
    /// Name shown to users, as supplied by the provider. May be empty.
    display_name: String,
    /// Dedup key across providers.
    email: String,
    /// The provider's own user id.
    provider_principal: String,
    /// The provider that first registered this email.
    provider: Provider,
    /// When the record was created.
    created_at: DateTime<Utc>,
    /// When the profile was last updated, if ever.
    updated_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Rebuilds an identity from storage.
    #[must_use]
    pub fn with_all_fields(
        id: IdentityId,
        display_name: String,
        email: String,
        provider_principal: String,
        provider: Provider,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            display_name,
            email,
            provider_principal,
            provider,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> IdentityId {
        self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn provider_principal(&self) -> &str {
        &self.provider_principal
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns the role claim derived from the owning provider.
    #[must_use]
    pub fn role_claim(&self) -> String {
        self.provider.role_claim()
    }
}
