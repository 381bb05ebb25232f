//! Login, callback, completion, authority-check and logout routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use social_login_identity::{
    AuthenticationContext, Identity, Provider, SessionId, session::store_authentication,
};
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::{
    AppState,
    middleware::{
        AuthRejection, OptionalSocialUser, SESSION_COOKIE, SessionAuthentication, SocialUser,
        session_id,
    },
    oauth::LoginState,
};
use crate::error::LoginError;

/// Login state cookie name (for CSRF protection during the OAuth2 flow).
const LOGIN_STATE_COOKIE: &str = "login_state";

/// Query parameters for the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: String,
    state: String,
}

fn parse_provider(tag: String) -> Result<Provider, LoginError> {
    tag.parse()
        .map_err(|_| LoginError::UnknownProvider { tag })
}

/// Generates a unique session ID using ULID.
pub fn generate_session_id() -> SessionId {
    SessionId::new(ulid::Ulid::new().to_string())
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").max_age(TimeDuration::ZERO).build()
}

/// Greets the signed-in user, or points to the login page.
pub async fn index(OptionalSocialUser(identity): OptionalSocialUser) -> impl IntoResponse {
    match identity {
        Some(identity) => format!("Signed in as {} <{}>", identity.display_name(), identity.email()),
        None => "Not signed in. Visit /login to sign in.".to_string(),
    }
}

/// Lists a login link for every configured provider.
pub async fn login_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let links: String = Provider::ALL
        .into_iter()
        .filter(|provider| state.provider(*provider).is_some())
        .map(|provider| format!("<li><a href=\"/login/{provider}\">Sign in with {provider}</a></li>"))
        .collect();

    Html(format!("<!DOCTYPE html><html><body><h1>Sign in</h1><ul>{links}</ul></body></html>"))
}

/// Starts the OAuth2 login flow by redirecting to the provider.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, LoginError> {
    let provider = parse_provider(tag)?;
    let client = state
        .provider(provider)
        .ok_or_else(|| LoginError::UnknownProvider {
            tag: provider.to_string(),
        })?;

    let (auth_url, login_state) = client.authorization_url();

    // Store the login state in a secure cookie for validation on callback
    let login_state_json = serde_json::to_string(&login_state).map_err(|e| LoginError::Internal {
        details: e.to_string(),
    })?;

    let cookie = Cookie::build((LOGIN_STATE_COOKIE, login_state_json))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(state.session_config.login_state_minutes));

    Ok((jar.add(cookie), Redirect::to(&auth_url)))
}

/// Handles the provider callback after the user authenticates.
///
/// Every successful login starts a fresh session whose authentication
/// context grants exactly the provider's role claim.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, LoginError> {
    let provider = parse_provider(tag)?;
    let client = state
        .provider(provider)
        .ok_or_else(|| LoginError::UnknownProvider {
            tag: provider.to_string(),
        })?;

    // Retrieve and validate login state from cookie
    let login_state_cookie = jar
        .get(LOGIN_STATE_COOKIE)
        .ok_or(LoginError::MissingLoginState)?;

    let login_state: LoginState = serde_json::from_str(login_state_cookie.value())
        .map_err(|_| LoginError::InvalidLoginState)?;

    if login_state.provider != provider {
        return Err(LoginError::ProviderMismatch);
    }

    if query.state != login_state.csrf_token {
        return Err(LoginError::CsrfMismatch);
    }

    let access_token = client
        .exchange_code(&query.code, &login_state.pkce_verifier)
        .await?;
    let payload = client.fetch_user_info(&access_token).await?;

    if let Some(previous) = session_id(&jar) {
        state.sessions.invalidate(&previous).await;
    }

    let session = generate_session_id();
    let authentication = AuthenticationContext::for_provider(provider, payload);
    store_authentication(state.sessions.as_ref(), &session, &authentication)
        .await
        .map_err(|e| LoginError::Internal {
            details: e.to_string(),
        })?;

    tracing::info!(provider = %provider, session = %session, "provider login completed");

    let session_cookie = Cookie::build((SESSION_COOKIE, session.as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax);

    let jar = jar.add(session_cookie).add(removal(LOGIN_STATE_COOKIE));

    Ok((jar, Redirect::to(&format!("/{provider}/complete"))))
}

/// Resolves the session's identity right after login, then goes home.
pub async fn complete(provider: Provider, SocialUser(identity): SocialUser) -> Redirect {
    tracing::debug!(provider = %provider, identity = %identity.id(), "login complete");
    Redirect::to("/")
}

/// Returns the session's resolved identity.
pub async fn me(SocialUser(identity): SocialUser) -> Json<Identity> {
    Json(identity)
}

fn authority_check(
    authentication: &SessionAuthentication,
    provider: Provider,
) -> Result<&'static str, AuthRejection> {
    authentication.require(provider)?;
    Ok(provider.as_str())
}

/// Answers only sessions holding the Facebook role claim.
pub async fn facebook(
    authentication: SessionAuthentication,
) -> Result<&'static str, AuthRejection> {
    authority_check(&authentication, Provider::Facebook)
}

/// Answers only sessions holding the Google role claim.
pub async fn google(authentication: SessionAuthentication) -> Result<&'static str, AuthRejection> {
    authority_check(&authentication, Provider::Google)
}

/// Answers only sessions holding the Kakao role claim.
pub async fn kakao(authentication: SessionAuthentication) -> Result<&'static str, AuthRejection> {
    authority_check(&authentication, Provider::Kakao)
}

/// Logs out by discarding the session.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(session) = session_id(&jar) {
        state.sessions.invalidate(&session).await;
    }

    (jar.add(removal(SESSION_COOKIE)), Redirect::to("/"))
}
