//! Social login identity resolution.
//!
//! This crate provides:
//! - The canonical identity model (`Identity`, `NewIdentity`)
//! - Provider payload normalization (`ProviderNormalizer`, `NormalizerRegistry`)
//! - Session attribute storage and the per-session identity cache
//! - The identity store contract with an in-memory implementation
//! - The per-request resolver (`IdentityResolver`)
//! - OAuth2 provider registrations
//!
//! # Resolution Model
//!
//! A session is resolved to an identity once. The first request after a
//! provider login normalizes the provider's user-info payload, finds or
//! creates the identity by email, and caches it in the session. Every later
//! request on that session is served from the cache.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use social_login_identity::{
//!     AuthenticationContext, IdentityResolver, InMemoryIdentityStore, InMemorySessionStore,
//!     NormalizerRegistry, Provider, RequestContext, SessionId, SessionIdentityCache,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let resolver = IdentityResolver::new(
//!     Arc::new(InMemoryIdentityStore::new()),
//!     SessionIdentityCache::new(Arc::new(InMemorySessionStore::new())),
//!     NormalizerRegistry::standard(),
//! );
//!
//! let payload = json!({"name": "Ann", "email": "ann@x.com", "id": "42"});
//! let mut request = RequestContext::new(
//!     SessionId::from("sess_abc123"),
//!     Some(AuthenticationContext::for_provider(Provider::Google, payload)),
//! );
//!
//! let identity = resolver.resolve(&mut request).await.into_identity().unwrap();
//! assert_eq!(identity.email(), "ann@x.com");
//! assert_eq!(identity.role_claim(), "ROLE_GOOGLE");
//! # });
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod normalizer;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use auth::{AuthenticationContext, RequestContext};
pub use config::{ConfigError, ProviderEndpoints, ProviderRegistration, ProviderRegistrationBuilder};
pub use error::{NormalizationError, ResolveError, StoreError};
pub use identity::{Identity, NewIdentity};
pub use normalizer::{
    FlatNormalizer, NestedNormalizer, NormalizerRegistry, ProviderNormalizer, RawProviderPayload,
};
pub use provider::{Provider, UnknownProvider};
pub use resolver::{IdentityResolver, Resolution};
pub use session::{InMemorySessionStore, SessionId, SessionIdentityCache, SessionStore};
pub use store::{IdentityStore, InMemoryIdentityStore};
