//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! `__` as the separator, e.g. `PROVIDERS__GOOGLE__CLIENT_ID`.
//!
//! See [`ProviderRegistration`](social_login_identity::ProviderRegistration)
//! for the registration each provider section is turned into.

use serde::Deserialize;
use social_login_identity::{ConfigError, Provider, ProviderRegistration};

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Maximum number of pooled database connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider registrations. Providers without a section are disabled.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Lifetime of the OAuth2 state cookie, in minutes.
    #[serde(default = "default_login_state_minutes")]
    pub login_state_minutes: i64,

    /// Idle time after which a session is discarded, in minutes.
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: i64,
}

fn default_secure_cookies() -> bool {
    true
}

fn default_login_state_minutes() -> i64 {
    10
}

fn default_idle_minutes() -> i64 {
    social_login_identity::session::DEFAULT_IDLE_TIMEOUT_MINUTES
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            login_state_minutes: default_login_state_minutes(),
            idle_minutes: default_idle_minutes(),
        }
    }
}

/// Per-provider settings as they appear in the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    pub facebook: Option<ProviderSettings>,
    pub google: Option<ProviderSettings>,
    pub kakao: Option<ProviderSettings>,
}

/// OAuth2 client settings for a single provider.
///
/// Endpoints and scopes fall back to the provider's built-in values.
#[derive(Clone, Deserialize)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_uri: Option<String>,
    pub token_uri: Option<String>,
    pub user_info_uri: Option<String>,
    /// Scopes as a comma-separated string.
    pub scopes: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl ProviderSettings {
    fn into_registration(self, provider: Provider) -> Result<ProviderRegistration, ConfigError> {
        let mut builder = ProviderRegistration::builder(
            provider,
            self.client_id,
            self.client_secret,
            self.redirect_uri,
        );
        if let Some(uri) = self.authorization_uri {
            builder = builder.authorization_uri(uri);
        }
        if let Some(uri) = self.token_uri {
            builder = builder.token_uri(uri);
        }
        if let Some(uri) = self.user_info_uri {
            builder = builder.user_info_uri(uri);
        }
        if let Some(scopes) = self.scopes {
            builder = builder.scopes(
                scopes
                    .split(',')
                    .map(str::trim)
                    .filter(|scope| !scope.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        builder.build()
    }
}

impl ProvidersConfig {
    /// Builds a registration for every configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured provider is missing a required value.
    pub fn registrations(self) -> Result<Vec<ProviderRegistration>, ConfigError> {
        [
            (Provider::Facebook, self.facebook),
            (Provider::Google, self.google),
            (Provider::Kakao, self.kakao),
        ]
        .into_iter()
        .filter_map(|(provider, settings)| settings.map(|s| s.into_registration(provider)))
        .collect()
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
