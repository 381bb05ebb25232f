//! Strongly-typed identifiers.
//!
//! Identity ids are ULIDs so that they sort by creation time. They are
//! displayed with an `idn_` prefix; parsing accepts the prefixed or the bare
//! form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

const IDENTITY_PREFIX: &str = "idn";

/// Error returned when parsing an id from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of id that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Persistent identifier of a canonical identity.
///
/// Assigned by the identity store when a record is first created and never
/// changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Ulid);

impl IdentityId {
    /// Generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Wraps an existing ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Returns the display prefix.
    #[must_use]
    pub const fn prefix() -> &'static str {
        IDENTITY_PREFIX
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{IDENTITY_PREFIX}_{}", self.0)
    }
}

impl FromStr for IdentityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(IDENTITY_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
            id_type: "IdentityId",
            reason: e.to_string(),
        })
    }
}

impl From<Ulid> for IdentityId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_prefix() {
        let id = IdentityId::new();
        assert!(id.to_string().starts_with("idn_"));
    }

    #[test]
    fn parses_prefixed_and_bare_forms() {
        let id = IdentityId::new();
        let prefixed: IdentityId = id.to_string().parse().expect("prefixed");
        let bare: IdentityId = id.as_ulid().to_string().parse().expect("bare");
        assert_eq!(prefixed, id);
        assert_eq!(bare, id);
    }

    #[test]
    fn rejects_garbage() {
        let err = "idn_not-a-ulid".parse::<IdentityId>().unwrap_err();
        assert_eq!(err.id_type, "IdentityId");
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let first = IdentityId::from_ulid(Ulid::from_parts(1_000, 7));
        let second = IdentityId::from_ulid(Ulid::from_parts(2_000, 7));
        assert!(first < second);
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = IdentityId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
