//! Per-session identity resolution.
//!
//! The resolver turns an authenticated provider session into a canonical
//! [`Identity`] exactly once per session. Later requests on the same session
//! are answered from the session identity cache without touching the store.

use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::auth::RequestContext;
use crate::error::{ResolveError, StoreError};
use crate::identity::{Identity, NewIdentity};
use crate::normalizer::NormalizerRegistry;
use crate::session::{SessionIdentityCache, store_authentication};
use crate::store::IdentityStore;

/// Outcome of resolving a request's session.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The session already had an identity; nothing else was consulted.
    Cached(Identity),
    /// The identity was resolved on this request and is now cached.
    Resolved {
        identity: Identity,
        /// True if the store created the record on this request.
        created: bool,
    },
    /// The session could not be resolved. Callers treat it as not yet
    /// authenticated.
    Unresolved(ResolveError),
}

impl Resolution {
    /// Returns the resolved identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Cached(identity) | Self::Resolved { identity, .. } => Some(identity),
            Self::Unresolved(_) => None,
        }
    }

    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Cached(identity) | Self::Resolved { identity, .. } => Some(identity),
            Self::Unresolved(_) => None,
        }
    }

    /// Returns the error if resolution failed.
    #[must_use]
    pub fn error(&self) -> Option<&ResolveError> {
        match self {
            Self::Unresolved(error) => Some(error),
            _ => None,
        }
    }
}

/// Resolves sessions to canonical identities.
///
/// Cloning is cheap; every clone shares the same store, cache and
/// normalizers.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    cache: SessionIdentityCache,
    normalizers: Arc<NormalizerRegistry>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        cache: SessionIdentityCache,
        normalizers: NormalizerRegistry,
    ) -> Self {
        Self {
            store,
            cache,
            normalizers: Arc::new(normalizers),
        }
    }

    /// Returns the session identity cache this resolver writes to.
    #[must_use]
    pub fn cache(&self) -> &SessionIdentityCache {
        &self.cache
    }

    /// Resolves the identity for the request's session.
    ///
    /// On success the request's authorities are repaired to carry the
    /// identity's role claim, the repaired authentication context is saved to
    /// the session, and only then is the identity cached. On failure neither
    /// the cache, the store, nor the authorities are touched.
    #[instrument(skip_all, fields(session = %request.session_id()))]
    pub async fn resolve(&self, request: &mut RequestContext) -> Resolution {
        if let Some(identity) = self.cache.lookup(request.session_id()).await {
            debug!(identity = %identity.id(), "session identity cache hit");
            return Resolution::Cached(identity);
        }

        match self.try_resolve(request).await {
            Ok((identity, created)) => {
                self.cache.store(request.session_id(), &identity).await;
                Resolution::Resolved { identity, created }
            }
            Err(report) => {
                warn!(error = %report, "session left unresolved");
                Resolution::Unresolved(report.current_context().clone())
            }
        }
    }

    async fn try_resolve(
        &self,
        request: &mut RequestContext,
    ) -> Result<(Identity, bool), Report<ResolveError>> {
        let authentication =
            request
                .authentication()
                .ok_or_else(|| ResolveError::AuthenticationContext {
                    reason: "session has no authentication context".to_string(),
                })?;

        let payload =
            authentication
                .payload_object()
                .ok_or_else(|| ResolveError::AuthenticationContext {
                    reason: "provider payload is not a JSON object".to_string(),
                })?;

        let provider =
            authentication
                .provider()
                .ok_or_else(|| ResolveError::UnsupportedProvider {
                    tag: authentication.registration_id().to_string(),
                })?;

        let normalizer =
            self.normalizers
                .get(provider)
                .ok_or_else(|| ResolveError::UnsupportedProvider {
                    tag: provider.to_string(),
                })?;

        let candidate = normalizer
            .normalize(payload)
            .map_err(ResolveError::from)?;

        let (identity, created) = self.find_or_create(candidate).await?;

        let role_claim = identity.role_claim();
        let session = request.session_id().clone();
        if let Some(authentication) = request.authentication_mut() {
            if !authentication.has_authority(&role_claim) {
                info!(
                    identity = %identity.id(),
                    role = %role_claim,
                    "replacing authorities with the identity's role claim"
                );
                let mut repaired = authentication.clone();
                repaired.replace_authorities(vec![role_claim]);
                store_authentication(self.cache.sessions(), &session, &repaired)
                    .await
                    .map_err(|e| ResolveError::AuthenticationContext {
                        reason: format!("repaired authorities could not be saved: {e}"),
                    })?;
                *authentication = repaired;
            }
        }

        Ok((identity, created))
    }

    /// Adopts the stored identity for the candidate's email, creating it if
    /// this is the email's first login.
    async fn find_or_create(
        &self,
        candidate: NewIdentity,
    ) -> Result<(Identity, bool), Report<ResolveError>> {
        if let Some(existing) = self
            .store
            .find_by_email(candidate.email())
            .await
            .map_err(store_unavailable)?
        {
            return Ok((existing, false));
        }

        let email = candidate.email().to_string();
        match self.store.create(candidate).await {
            Ok(identity) => {
                info!(
                    identity = %identity.id(),
                    provider = %identity.provider(),
                    "created identity"
                );
                Ok((identity, true))
            }
            Err(report) if matches!(report.current_context(), StoreError::EmailConflict { .. }) => {
                debug!("email registered concurrently, adopting the stored identity");
                let winner = self
                    .store
                    .find_by_email(&email)
                    .await
                    .map_err(store_unavailable)?;
                winner.map(|identity| (identity, false)).ok_or_else(|| {
                    ResolveError::StoreUnavailable {
                        reason: "conflicting identity could not be re-read".to_string(),
                    }
                    .into()
                })
            }
            Err(report) => Err(store_unavailable(report)),
        }
    }
}

fn store_unavailable(report: Report<StoreError>) -> Report<ResolveError> {
    ResolveError::StoreUnavailable {
        reason: report.current_context().to_string(),
    }
    .into()
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("cache", &self.cache)
            .field("normalizers", &self.normalizers)
            .finish_non_exhaustive()
    }
}
