//! Authentication module for the social-login server.
//!
//! This module provides:
//! - OAuth2 login against each configured provider
//! - The PostgreSQL identity store
//! - Extractors that resolve the session's identity for Axum routes
//!
//! # Session Model
//!
//! Sessions live in process memory. A completed provider login stores its
//! authentication context under the session's `authentication` attribute;
//! the first extractor that needs an identity resolves it and caches it in
//! the same session.

pub mod db;
pub mod middleware;
pub mod oauth;
pub mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use social_login_identity::{
    IdentityResolver, IdentityStore, NormalizerRegistry, Provider, SessionIdentityCache,
    SessionStore,
};

use crate::config::SessionConfig;

pub use db::PgIdentityStore;
pub use middleware::{AuthRejection, OptionalSocialUser, SessionAuthentication, SocialUser};
pub use oauth::ProviderClient;

/// Shared application state.
pub struct AppState {
    /// Resolves sessions to identities.
    pub resolver: IdentityResolver,
    /// Session attribute storage.
    pub sessions: Arc<dyn SessionStore>,
    /// OAuth2 clients for the configured providers.
    pub providers: HashMap<Provider, ProviderClient>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
        providers: Vec<ProviderClient>,
        session_config: SessionConfig,
    ) -> Self {
        let resolver = IdentityResolver::new(
            identities,
            SessionIdentityCache::new(sessions.clone()),
            NormalizerRegistry::standard(),
        );

        Self {
            resolver,
            sessions,
            providers: providers
                .into_iter()
                .map(|client| (client.provider(), client))
                .collect(),
            session_config,
        }
    }

    /// Returns the OAuth2 client for `provider`, if it is configured.
    pub fn provider(&self, provider: Provider) -> Option<&ProviderClient> {
        self.providers.get(&provider)
    }
}
