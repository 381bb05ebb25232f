//! Identity providers and the role claims derived from them.
//!
//! Every provider maps to exactly one role claim of the form
//! `ROLE_<PROVIDER>`. The claim is what the authentication context carries
//! as its granted authority, and it is how the resolver tells which provider
//! authenticated a session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every provider role claim.
pub const ROLE_PREFIX: &str = "ROLE_";

/// An OAuth2 identity provider supported by the platform.
///
/// Facebook and Google return flat user-info payloads; Kakao nests its
/// profile fields under `properties`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Facebook,
    Google,
    Kakao,
}

impl Provider {
    /// All known providers, in registration order.
    pub const ALL: [Provider; 3] = [Provider::Facebook, Provider::Google, Provider::Kakao];

    /// Returns the lowercase provider name used in routes and configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::Kakao => "kakao",
        }
    }

    /// Returns the role claim granted to sessions authenticated by this provider.
    #[must_use]
    pub fn role_claim(&self) -> String {
        format!("{ROLE_PREFIX}{}", self.as_str().to_uppercase())
    }

    /// Returns true if `authority` is this provider's role claim.
    #[must_use]
    pub fn matches_claim(&self, authority: &str) -> bool {
        authority
            .strip_prefix(ROLE_PREFIX)
            .is_some_and(|name| name == self.as_str().to_uppercase())
    }

    /// Finds the provider whose role claim equals `authority`.
    #[must_use]
    pub fn from_role_claim(authority: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.matches_claim(authority))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}
