//! OAuth2 authorization-code login against a social provider.
//!
//! One `ProviderClient` exists per configured provider. It builds the
//! authorization redirect, exchanges the returned code for an access token,
//! and fetches the provider's user-info payload with that token.

use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use social_login_identity::{Provider, ProviderRegistration};
use tracing::instrument;

/// OAuth2 client for one provider.
#[derive(Clone)]
pub struct ProviderClient {
    provider: Provider,
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    user_info_url: reqwest::Url,
    scopes: Vec<Scope>,
    http: reqwest::Client,
}

impl ProviderClient {
    /// Creates a client from a provider registration.
    ///
    /// `http` should not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured URL is invalid.
    pub fn new(registration: &ProviderRegistration, http: reqwest::Client) -> Result<Self, OAuthError> {
        let invalid = |what: &str, e: String| {
            OAuthError::Configuration(format!(
                "invalid {} {} URL: {}",
                registration.provider(),
                what,
                e
            ))
        };

        let auth_url = AuthUrl::new(registration.authorization_uri().to_string())
            .map_err(|e| invalid("authorization", e.to_string()))?;
        let token_url = TokenUrl::new(registration.token_uri().to_string())
            .map_err(|e| invalid("token", e.to_string()))?;
        let redirect_url = RedirectUrl::new(registration.redirect_uri().to_string())
            .map_err(|e| invalid("redirect", e.to_string()))?;
        let user_info_url = reqwest::Url::parse(registration.user_info_uri())
            .map_err(|e| invalid("user-info", e.to_string()))?;

        Ok(Self {
            provider: registration.provider(),
            client_id: ClientId::new(registration.client_id().to_string()),
            client_secret: ClientSecret::new(registration.client_secret().to_string()),
            auth_url,
            token_url,
            redirect_url,
            user_info_url,
            scopes: registration
                .scopes()
                .iter()
                .map(|scope| Scope::new(scope.clone()))
                .collect(),
            http,
        })
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Generates the authorization URL for this provider.
    ///
    /// Returns the URL to redirect the user to, along with the login state to
    /// keep until the callback.
    pub fn authorization_url(&self) -> (String, LoginState) {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .set_pkce_challenge(pkce_challenge)
            .url();

        let state = LoginState {
            provider: self.provider,
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };

        (auth_url.to_string(), state)
    }

    /// Exchanges the authorization code for an access token.
    #[instrument(skip_all, fields(provider = %self.provider))]
    pub async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, OAuthError> {
        // Facebook and Kakao only accept client credentials in the request body.
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let token_result = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        Ok(token_result.access_token().secret().clone())
    }

    /// Fetches the user-info payload for an access token.
    #[instrument(skip_all, fields(provider = %self.provider))]
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<Value, OAuthError> {
        let response = self
            .http
            .get(self.user_info_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| OAuthError::UserInfo(e.to_string()))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// State kept in a short-lived cookie between the login redirect and the
/// provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
    pub provider: Provider,
    pub csrf_token: String,
    pub pkce_verifier: String,
}

/// OAuth2 login errors.
#[derive(Debug)]
pub enum OAuthError {
    /// Configuration error.
    Configuration(String),
    /// Token exchange failed.
    TokenExchange(String),
    /// The user-info request failed or returned something other than JSON.
    UserInfo(String),
}

impl std::fmt::Display for OAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Self::TokenExchange(msg) => write!(f, "Token exchange error: {}", msg),
            Self::UserInfo(msg) => write!(f, "User info error: {}", msg),
        }
    }
}

impl std::error::Error for OAuthError {}
