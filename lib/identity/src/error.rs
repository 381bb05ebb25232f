//! Error types for identity resolution.
//!
//! Errors are designed for layered context using rootcause:
//! - `NormalizationError`: a provider payload could not become a candidate identity
//! - `StoreError`: the identity store collaborator failed or refused a write
//! - `ResolveError`: why a session could not be resolved to an identity

use crate::provider::Provider;
use std::fmt;

/// Errors from turning a raw provider payload into a candidate identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The payload carried no usable email address.
    MissingEmail { provider: Provider },
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEmail { provider } => {
                write!(f, "{provider} payload has no email address")
            }
        }
    }
}

impl std::error::Error for NormalizationError {}

/// Errors reported by an identity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the operation failed.
    Unavailable { reason: String },
    /// Another record already owns this email.
    EmailConflict { email: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => {
                write!(f, "identity store unavailable: {reason}")
            }
            Self::EmailConflict { email } => {
                write!(f, "an identity already exists for {email}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Reasons a session could not be resolved to an identity.
///
/// None of these are fatal: the resolver recovers every variant and reports
/// the session as unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No authentication context, or one of an unexpected shape.
    AuthenticationContext { reason: String },
    /// The authenticating provider is unknown or has no normalizer.
    UnsupportedProvider { tag: String },
    /// The provider payload could not be normalized.
    Normalization(NormalizationError),
    /// The identity store failed.
    StoreUnavailable { reason: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationContext { reason } => {
                write!(f, "authentication context error: {reason}")
            }
            Self::UnsupportedProvider { tag } => {
                write!(f, "unsupported provider: {tag}")
            }
            Self::Normalization(err) => {
                write!(f, "normalization failed: {err}")
            }
            Self::StoreUnavailable { reason } => {
                write!(f, "identity store unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<NormalizationError> for ResolveError {
    fn from(err: NormalizationError) -> Self {
        Self::Normalization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_email_names_provider() {
        let err = NormalizationError::MissingEmail {
            provider: Provider::Kakao,
        };
        assert!(err.to_string().contains("kakao"));
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn email_conflict_display() {
        let err = StoreError::EmailConflict {
            email: "ann@x.com".to_string(),
        };
        assert!(err.to_string().contains("ann@x.com"));
    }

    #[test]
    fn resolve_error_wraps_normalization() {
        let err: ResolveError = NormalizationError::MissingEmail {
            provider: Provider::Google,
        }
        .into();
        assert!(matches!(err, ResolveError::Normalization(_)));
        assert!(err.to_string().starts_with("normalization failed"));
    }

    #[test]
    fn unsupported_provider_display() {
        let err = ResolveError::UnsupportedProvider {
            tag: "github".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported provider: github");
    }
}
