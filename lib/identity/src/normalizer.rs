//! Provider payload normalization.
//!
//! Each provider returns user info in its own shape. A normalizer reads one
//! shape and produces a [`NewIdentity`]. Missing or non-scalar fields become
//! empty strings, except email, which must be present.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::NormalizationError;
use crate::identity::NewIdentity;
use crate::provider::Provider;

/// A user-info payload as returned by a provider.
pub type RawProviderPayload = Map<String, Value>;

/// Converts one provider's user-info payload into a candidate identity.
pub trait ProviderNormalizer: Send + Sync {
    /// The provider whose payloads this normalizer understands.
    fn provider(&self) -> Provider;

    /// Builds a candidate identity from the payload.
    ///
    /// # Errors
    ///
    /// Returns `NormalizationError::MissingEmail` if the payload has no email.
    fn normalize(&self, payload: &RawProviderPayload) -> Result<NewIdentity, NormalizationError>;
}

/// Reads a scalar field as a string. Anything else reads as empty.
fn scalar(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Normalizer for providers with a flat `{name, email, id}` payload.
#[derive(Debug, Clone, Copy)]
pub struct FlatNormalizer {
    provider: Provider,
}

impl FlatNormalizer {
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }
}

impl ProviderNormalizer for FlatNormalizer {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn normalize(&self, payload: &RawProviderPayload) -> Result<NewIdentity, NormalizationError> {
        NewIdentity::new(
            self.provider,
            scalar(payload.get("name")),
            scalar(payload.get("email")),
            scalar(payload.get("id")),
        )
    }
}

/// Normalizer for Kakao's nested payload.
///
/// The nickname lives under `properties`, the email under `kaccount_email`,
/// and the account id at the top level.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedNormalizer;

impl NestedNormalizer {
    const PROPERTIES: &'static str = "properties";
    const NICKNAME: &'static str = "nickname";
    const EMAIL: &'static str = "kaccount_email";
}

impl ProviderNormalizer for NestedNormalizer {
    fn provider(&self) -> Provider {
        Provider::Kakao
    }

    fn normalize(&self, payload: &RawProviderPayload) -> Result<NewIdentity, NormalizationError> {
        let nickname = payload
            .get(Self::PROPERTIES)
            .and_then(Value::as_object)
            .and_then(|properties| properties.get(Self::NICKNAME));

        NewIdentity::new(
            Provider::Kakao,
            scalar(nickname),
            scalar(payload.get(Self::EMAIL)),
            scalar(payload.get("id")),
        )
    }
}

/// Maps each provider to the normalizer for its payload shape.
pub struct NormalizerRegistry {
    normalizers: HashMap<Provider, Box<dyn ProviderNormalizer>>,
}

impl NormalizerRegistry {
    /// Creates a registry with no normalizers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            normalizers: HashMap::new(),
        }
    }

    /// Creates a registry for every built-in provider.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with(FlatNormalizer::new(Provider::Facebook))
            .with(FlatNormalizer::new(Provider::Google))
            .with(NestedNormalizer)
    }

    /// Adds a normalizer, replacing any existing one for the same provider.
    #[must_use]
    pub fn with(mut self, normalizer: impl ProviderNormalizer + 'static) -> Self {
        self.register(Box::new(normalizer));
        self
    }

    /// Adds a normalizer, replacing any existing one for the same provider.
    pub fn register(&mut self, normalizer: Box<dyn ProviderNormalizer>) {
        self.normalizers.insert(normalizer.provider(), normalizer);
    }

    /// Returns the normalizer for `provider`, if one is registered.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&dyn ProviderNormalizer> {
        self.normalizers.get(&provider).map(|normalizer| &**normalizer)
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerRegistry")
            .field("providers", &self.normalizers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RawProviderPayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn flat_payload_maps_name_email_and_id() {
        let raw = payload(json!({"name": "Ann", "email": "ann@x.com", "id": "42"}));

        let candidate = FlatNormalizer::new(Provider::Facebook)
            .normalize(&raw)
            .expect("normalize");

        assert_eq!(candidate.display_name(), "Ann");
        assert_eq!(candidate.email(), "ann@x.com");
        assert_eq!(candidate.provider_principal(), "42");
        assert_eq!(candidate.provider(), Provider::Facebook);
    }

    #[test]
    fn nested_payload_reads_properties_and_kakao_email() {
        let raw = payload(json!({
            "properties": {"nickname": "Bo"},
            "kaccount_email": "bo@y.com",
            "id": "7"
        }));

        let candidate = NestedNormalizer.normalize(&raw).expect("normalize");

        assert_eq!(candidate.display_name(), "Bo");
        assert_eq!(candidate.email(), "bo@y.com");
        assert_eq!(candidate.provider_principal(), "7");
        assert_eq!(candidate.provider(), Provider::Kakao);
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let raw = payload(json!({"kaccount_email": "bo@y.com", "id": 123456789}));
        let candidate = NestedNormalizer.normalize(&raw).expect("normalize");
        assert_eq!(candidate.provider_principal(), "123456789");
    }

    #[test]
    fn missing_optional_fields_become_empty() {
        let raw = payload(json!({"email": "ann@x.com", "name": null}));
        let candidate = FlatNormalizer::new(Provider::Google)
            .normalize(&raw)
            .expect("normalize");
        assert_eq!(candidate.display_name(), "");
        assert_eq!(candidate.provider_principal(), "");
    }

    #[test]
    fn malformed_properties_yield_empty_nickname() {
        let raw = payload(json!({"properties": "oops", "kaccount_email": "bo@y.com", "id": "7"}));
        let candidate = NestedNormalizer.normalize(&raw).expect("normalize");
        assert_eq!(candidate.display_name(), "");
    }

    #[test]
    fn missing_email_fails() {
        let flat = payload(json!({"name": "Ann", "id": "42"}));
        assert_eq!(
            FlatNormalizer::new(Provider::Google).normalize(&flat),
            Err(NormalizationError::MissingEmail {
                provider: Provider::Google
            })
        );

        // Kakao ignores a top-level `email`.
        let nested = payload(json!({"email": "bo@y.com", "id": "7"}));
        assert!(NestedNormalizer.normalize(&nested).is_err());
    }

    #[test]
    fn non_string_email_fails() {
        let raw = payload(json!({"email": {"primary": "ann@x.com"}}));
        assert!(FlatNormalizer::new(Provider::Facebook).normalize(&raw).is_err());
    }

    #[test]
    fn standard_registry_covers_every_provider() {
        let registry = NormalizerRegistry::standard();
        for provider in Provider::ALL {
            let normalizer = registry.get(provider).expect("registered");
            assert_eq!(normalizer.provider(), provider);
        }
    }

    #[test]
    fn empty_registry_has_no_normalizers() {
        let registry = NormalizerRegistry::empty();
        assert!(registry.get(Provider::Google).is_none());
    }

    #[test]
    fn register_replaces_existing_normalizer() {
        struct Fixed;

        impl ProviderNormalizer for Fixed {
            fn provider(&self) -> Provider {
                Provider::Google
            }

            fn normalize(
                &self,
                _payload: &RawProviderPayload,
            ) -> Result<NewIdentity, NormalizationError> {
                NewIdentity::new(
                    Provider::Google,
                    "fixed".to_string(),
                    "fixed@x.com".to_string(),
                    "0".to_string(),
                )
            }
        }

        let registry = NormalizerRegistry::standard().with(Fixed);
        let candidate = registry
            .get(Provider::Google)
            .expect("registered")
            .normalize(&RawProviderPayload::new())
            .expect("normalize");
        assert_eq!(candidate.email(), "fixed@x.com");
    }
}
