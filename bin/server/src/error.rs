//! Error types for the login flow.
//!
//! Internal failures are logged here and answered with a generic message;
//! provider and database details never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use crate::auth::oauth::OAuthError;

/// Errors from the provider login and callback routes.
#[derive(Debug)]
pub enum LoginError {
    /// The provider in the path is unknown or not configured.
    UnknownProvider { tag: String },
    /// The login state cookie is absent.
    MissingLoginState,
    /// The login state cookie could not be decoded.
    InvalidLoginState,
    /// The callback arrived for a different provider than the login started with.
    ProviderMismatch,
    /// The `state` parameter does not match the login state cookie.
    CsrfMismatch,
    /// Token exchange or user-info fetch failed.
    OAuth(OAuthError),
    /// Anything else that went wrong on our side.
    Internal { details: String },
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProvider { tag } => write!(f, "unknown provider '{}'", tag),
            Self::MissingLoginState => write!(f, "missing login state"),
            Self::InvalidLoginState => write!(f, "invalid login state"),
            Self::ProviderMismatch => write!(f, "callback provider does not match login"),
            Self::CsrfMismatch => write!(f, "CSRF token mismatch"),
            Self::OAuth(err) => write!(f, "OAuth2 login failed: {}", err),
            Self::Internal { details } => write!(f, "internal error: {}", details),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<OAuthError> for LoginError {
    fn from(err: OAuthError) -> Self {
        Self::OAuth(err)
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::UnknownProvider { .. } => (StatusCode::NOT_FOUND, "Unknown provider"),
            Self::MissingLoginState => (StatusCode::BAD_REQUEST, "Missing login state"),
            Self::InvalidLoginState | Self::ProviderMismatch => {
                (StatusCode::BAD_REQUEST, "Invalid login state")
            }
            Self::CsrfMismatch => (StatusCode::BAD_REQUEST, "CSRF token mismatch"),
            Self::OAuth(err) => {
                tracing::error!("Provider login failed: {}", err);
                (StatusCode::BAD_GATEWAY, "Authentication failed")
            }
            Self::Internal { details } => {
                tracing::error!("Login error: {}", details);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
