//! OAuth2 client registration for each provider.
//!
//! A registration carries the client credentials issued by the provider and
//! the endpoints the login flow talks to. Endpoints and scopes default to the
//! provider's public values and can be overridden.

use std::fmt;

use crate::provider::Provider;

/// Public OAuth2 endpoints of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorization_uri: &'static str,
    pub token_uri: &'static str,
    pub user_info_uri: &'static str,
    pub scopes: &'static [&'static str],
}

impl ProviderEndpoints {
    /// Returns the built-in endpoints for `provider`.
    ///
    /// Kakao's v1 user-info endpoint is the one that returns the
    /// `kaccount_email` and `properties` shape.
    #[must_use]
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Facebook => Self {
                authorization_uri: "https://www.facebook.com/dialog/oauth",
                token_uri: "https://graph.facebook.com/oauth/access_token",
                user_info_uri: "https://graph.facebook.com/me?fields=id,name,email",
                scopes: &["email"],
            },
            Provider::Google => Self {
                authorization_uri: "https://accounts.google.com/o/oauth2/v2/auth",
                token_uri: "https://oauth2.googleapis.com/token",
                user_info_uri: "https://www.googleapis.com/oauth2/v2/userinfo",
                scopes: &["email", "profile"],
            },
            Provider::Kakao => Self {
                authorization_uri: "https://kauth.kakao.com/oauth/authorize",
                token_uri: "https://kauth.kakao.com/oauth/token",
                user_info_uri: "https://kapi.kakao.com/v1/user/me",
                scopes: &[],
            },
        }
    }
}

/// Errors from building a provider registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was empty.
    MissingField {
        provider: Provider,
        field: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { provider, field } => {
                write!(f, "{provider} registration is missing {field}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// OAuth2 client registration for one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderRegistration {
    provider: Provider,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorization_uri: String,
    token_uri: String,
    user_info_uri: String,
    scopes: Vec<String>,
}

impl ProviderRegistration {
    /// Creates a registration builder with the provider's built-in endpoints.
    #[must_use]
    pub fn builder(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> ProviderRegistrationBuilder {
        ProviderRegistrationBuilder::new(provider, client_id, client_secret, redirect_uri)
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the redirect URI registered with the provider.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn authorization_uri(&self) -> &str {
        &self.authorization_uri
    }

    #[must_use]
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    #[must_use]
    pub fn user_info_uri(&self) -> &str {
        &self.user_info_uri
    }

    /// Returns the scopes to request.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorization_uri", &self.authorization_uri)
            .field("token_uri", &self.token_uri)
            .field("user_info_uri", &self.user_info_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Builder for `ProviderRegistration`.
#[derive(Debug)]
pub struct ProviderRegistrationBuilder {
    provider: Provider,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorization_uri: String,
    token_uri: String,
    user_info_uri: String,
    scopes: Vec<String>,
}

impl ProviderRegistrationBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        let endpoints = ProviderEndpoints::for_provider(provider);
        Self {
            provider,
            client_id,
            client_secret,
            redirect_uri,
            authorization_uri: endpoints.authorization_uri.to_string(),
            token_uri: endpoints.token_uri.to_string(),
            user_info_uri: endpoints.user_info_uri.to_string(),
            scopes: endpoints.scopes.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn authorization_uri(mut self, uri: String) -> Self {
        self.authorization_uri = uri;
        self
    }

    #[must_use]
    pub fn token_uri(mut self, uri: String) -> Self {
        self.token_uri = uri;
        self
    }

    #[must_use]
    pub fn user_info_uri(mut self, uri: String) -> Self {
        self.user_info_uri = uri;
        self
    }

    /// Sets the OAuth2 scopes to request.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds a scope to the list of scopes to request.
    #[must_use]
    pub fn add_scope(mut self, scope: String) -> Self {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Builds the registration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` if a credential, the redirect URI,
    /// or an endpoint is blank.
    pub fn build(self) -> Result<ProviderRegistration, ConfigError> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("authorization_uri", &self.authorization_uri),
            ("token_uri", &self.token_uri),
            ("user_info_uri", &self.user_info_uri),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                provider: self.provider,
                field: *field,
            });
        }

        Ok(ProviderRegistration {
            provider: self.provider,
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri: self.redirect_uri,
            authorization_uri: self.authorization_uri,
            token_uri: self.token_uri,
            user_info_uri: self.user_info_uri,
            scopes: self.scopes,
        })
    }
}
