//! Provider registry: discriminator string → factory.
//!
//! Configuration selects provider implementations by the `type` key of
//! each `[[providers]]` table. The registry resolves that discriminator to
//! a factory and builds the provider list in declaration order, failing at
//! load time on an unknown type. Custom providers register the same way
//! the builtins do.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProviderEntry;
use crate::error::HarnessError;
use crate::process::ProcessExecutor;
use crate::provider::SourceControl;
use crate::provider_accurev::{AccuRevProvider, AccuRevProviderConfig};
use crate::provider_null::{NullProvider, NullProviderConfig};
use crate::provider_vault::{VaultProvider, VaultProviderConfig};

/// Builds one provider from its instance name and the raw parameter table
/// of its `[[providers]]` entry.
pub type ProviderFactory = Box<
    dyn Fn(&str, &toml::Table, Arc<dyn ProcessExecutor>) -> Result<Box<dyn SourceControl>, HarnessError>
        + Send
        + Sync,
>;

/// Registry of provider factories keyed by type discriminator.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
    executor: Arc<dyn ProcessExecutor>,
}

impl ProviderRegistry {
    /// An empty registry using the given executor for all providers.
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            factories: HashMap::new(),
            executor,
        }
    }

    /// A registry pre-loaded with the built-in provider types.
    pub fn with_builtins(executor: Arc<dyn ProcessExecutor>) -> Self {
        let mut registry = Self::new(executor);
        registry.register("vault", |name, params, executor| {
            let config: VaultProviderConfig = decode(name, params)?;
            Ok(Box::new(VaultProvider::new(name, config, executor)))
        });
        registry.register("accurev", |name, params, executor| {
            let config: AccuRevProviderConfig = decode(name, params)?;
            Ok(Box::new(AccuRevProvider::new(name, config, executor)))
        });
        registry.register("null", |name, params, _executor| {
            let config: NullProviderConfig = decode(name, params)?;
            Ok(Box::new(NullProvider::new(name, config)))
        });
        registry
    }

    /// Register a factory for a provider type, replacing any existing one.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&str, &toml::Table, Arc<dyn ProcessExecutor>) -> Result<Box<dyn SourceControl>, HarnessError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.to_string(), Box::new(factory));
    }

    /// Registered type discriminators, sorted for stable diagnostics.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build providers for the configured entries, in declaration order.
    ///
    /// An unknown discriminator or an undecodable parameter table is a
    /// configuration error — raised here, before any polling occurs.
    pub fn build(
        &self,
        entries: &[ProviderEntry],
    ) -> Result<Vec<Box<dyn SourceControl>>, HarnessError> {
        entries
            .iter()
            .map(|entry| {
                let factory = self.factories.get(&entry.kind).ok_or_else(|| {
                    HarnessError::configuration(format!(
                        "unknown provider type '{}' (known: {})",
                        entry.kind,
                        self.kinds().join(", ")
                    ))
                })?;
                factory(entry.effective_name(), &entry.params, self.executor.clone())
            })
            .collect()
    }
}

/// Decode a provider's parameter table into its typed config.
fn decode<T: serde::de::DeserializeOwned>(
    name: &str,
    params: &toml::Table,
) -> Result<T, HarnessError> {
    toml::Value::Table(params.clone()).try_into().map_err(|e| {
        HarnessError::configuration(format!("provider '{}': {}", name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::SystemExecutor;

    fn entry(kind: &str, name: Option<&str>, extra: &[(&str, toml::Value)]) -> ProviderEntry {
        let mut params = toml::Table::new();
        for (key, value) in extra {
            params.insert(key.to_string(), value.clone());
        }
        ProviderEntry {
            kind: kind.to_string(),
            name: name.map(str::to_string),
            params,
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::with_builtins(Arc::new(SystemExecutor))
    }

    #[test]
    fn builds_builtins_in_declaration_order() {
        let providers = registry()
            .build(&[
                entry("null", Some("first"), &[]),
                entry(
                    "vault",
                    Some("second"),
                    &[("host", toml::Value::String("vaultserver".into()))],
                ),
                entry(
                    "accurev",
                    None,
                    &[("depot", toml::Value::String("acme".into()))],
                ),
            ])
            .unwrap();

        assert_eq!(providers.len(), 3);
        assert_eq!(providers[0].name(), "first");
        assert_eq!(providers[0].provider_type(), "null");
        assert_eq!(providers[1].provider_type(), "vault");
        assert_eq!(providers[2].name(), "accurev");
    }

    #[test]
    fn unknown_type_is_a_configuration_error() {
        let err = registry().build(&[entry("cvs", None, &[])]).unwrap_err();
        match err {
            HarnessError::Configuration(msg) => {
                assert!(msg.contains("cvs"));
                assert!(msg.contains("vault"));
            }
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn undecodable_params_are_a_configuration_error() {
        let err = registry()
            .build(&[entry(
                "null",
                None,
                &[("always_modified", toml::Value::String("yes".into()))],
            )])
            .unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn custom_factories_can_be_registered() {
        let mut registry = registry();
        registry.register("custom", |name, _params, _executor| {
            Ok(Box::new(crate::provider_null::NullProvider::new(
                name,
                Default::default(),
            )))
        });

        let providers = registry.build(&[entry("custom", Some("mine"), &[])]).unwrap();
        assert_eq!(providers[0].name(), "mine");
    }
}
