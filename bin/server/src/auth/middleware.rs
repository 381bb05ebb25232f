//! Authentication extractors for Axum.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use social_login_identity::{
    AuthenticationContext, Identity, Provider, RequestContext, SessionId,
    session::load_authentication,
};
use std::sync::Arc;

use super::AppState;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Returns the session id carried by the session cookie.
pub fn session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| SessionId::new(cookie.value().to_string()))
}

/// Extractor for the session's resolved identity.
///
/// Runs identity resolution for the session. Unresolved sessions are
/// redirected to the login page.
pub struct SocialUser(pub Identity);

impl<S> FromRequestParts<S> for SocialUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        let session = session_id(&jar).ok_or(AuthRejection::NotAuthenticated)?;

        let authentication = load_authentication(app_state.sessions.as_ref(), &session).await;
        let mut request = RequestContext::new(session, authentication);

        app_state
            .resolver
            .resolve(&mut request)
            .await
            .into_identity()
            .map(SocialUser)
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

/// Extractor for optionally getting the resolved identity.
///
/// Returns None if the session cannot be resolved.
pub struct OptionalSocialUser(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalSocialUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match SocialUser::from_request_parts(parts, state).await {
            Ok(SocialUser(identity)) => Ok(OptionalSocialUser(Some(identity))),
            Err(_) => Ok(OptionalSocialUser(None)),
        }
    }
}

/// Extractor for the session's authentication context, without resolving
/// an identity.
pub struct SessionAuthentication(pub AuthenticationContext);

impl SessionAuthentication {
    /// Fails with `Forbidden` unless `provider`'s role claim has been granted.
    pub fn require(&self, provider: Provider) -> Result<(), AuthRejection> {
        if self.0.has_authority(&provider.role_claim()) {
            Ok(())
        } else {
            Err(AuthRejection::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for SessionAuthentication
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        let session = session_id(&jar).ok_or(AuthRejection::NotAuthenticated)?;
        load_authentication(app_state.sessions.as_ref(), &session)
            .await
            .map(SessionAuthentication)
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
    Forbidden,
    InternalError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => Redirect::to("/login").into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            Self::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
