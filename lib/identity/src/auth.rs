//! Per-request authentication state.
//!
//! This module provides the inputs the resolver works on:
//! - `AuthenticationContext`: what the OAuth2 login left behind for a session
//! - `RequestContext`: the session id plus its optional authentication context

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalizer::RawProviderPayload;
use crate::provider::Provider;
use crate::session::SessionId;

/// The result of a completed provider login.
///
/// Holds the registration id of the login route that produced it, the raw
/// user-info payload, and the authorities granted to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    registration_id: String,
    payload: Value,
    authorities: Vec<String>,
}

impl AuthenticationContext {
    /// Creates a new authentication context.
    #[must_use]
    pub fn new(registration_id: impl Into<String>, payload: Value, authorities: Vec<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            payload,
            authorities,
        }
    }

    /// Creates the context a fresh login through `provider` produces: the
    /// provider's own role claim is the only authority.
    #[must_use]
    pub fn for_provider(provider: Provider, payload: Value) -> Self {
        Self::new(provider.as_str(), payload, vec![provider.role_claim()])
    }

    /// Returns the registration id, e.g. `"google"`.
    #[must_use]
    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the payload if it is a JSON object.
    #[must_use]
    pub fn payload_object(&self) -> Option<&RawProviderPayload> {
        self.payload.as_object()
    }

    /// Returns the granted authorities in grant order.
    #[must_use]
    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Returns true if `authority` has been granted.
    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|granted| granted == authority)
    }

    /// Replaces every granted authority.
    pub fn replace_authorities(&mut self, authorities: Vec<String>) {
        self.authorities = authorities;
    }

    /// Returns the first authority that is a known provider's role claim.
    #[must_use]
    pub fn provider(&self) -> Option<Provider> {
        self.authorities
            .iter()
            .find_map(|authority| Provider::from_role_claim(authority))
    }
}

/// Everything the resolver needs to know about the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    session_id: SessionId,
    authentication: Option<AuthenticationContext>,
}

impl RequestContext {
    /// Creates a request context.
    #[must_use]
    pub fn new(session_id: SessionId, authentication: Option<AuthenticationContext>) -> Self {
        Self {
            session_id,
            authentication,
        }
    }

    /// Creates a request context for a session that has not logged in.
    #[must_use]
    pub fn anonymous(session_id: SessionId) -> Self {
        Self::new(session_id, None)
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn authentication(&self) -> Option<&AuthenticationContext> {
        self.authentication.as_ref()
    }

    pub fn authentication_mut(&mut self) -> Option<&mut AuthenticationContext> {
        self.authentication.as_mut()
    }

    /// Consumes the context, returning the authentication context.
    #[must_use]
    pub fn into_authentication(self) -> Option<AuthenticationContext> {
        self.authentication
    }
}
