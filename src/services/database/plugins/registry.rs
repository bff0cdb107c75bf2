//! Plugin registry: the dialect → capability lookup every component uses.

use std::collections::HashMap;
use std::sync::Arc;

use async_lock::RwLock;
use tracing::{info, warn};

use super::descriptor::PluginDescriptor;
use crate::error::{Error, Result};
use crate::services::database::traits::{
    ConnectionProvider, DatabaseProvider, Dialect, ValueDecoder,
};
use crate::services::drivers::{DriverSpec, PackageCoordinates};

/// Registry of dialect plugins.
///
/// At most one descriptor is active per dialect. Registering a second
/// descriptor for a dialect replaces the first.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<Dialect, Arc<PluginDescriptor>>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry holding the built-in dialect plugins.
    pub async fn with_builtin_plugins() -> Result<Self> {
        let registry = Self::new();
        for descriptor in crate::services::database::drivers::builtin_plugins()? {
            registry.register(descriptor).await;
        }
        Ok(registry)
    }

    /// Register a plugin, returning the descriptor it replaced, if any.
    pub async fn register(&self, descriptor: PluginDescriptor) -> Option<Arc<PluginDescriptor>> {
        let dialect = descriptor.dialect();
        let id = descriptor.id().to_string();

        let mut plugins = self.plugins.write().await;
        let replaced = plugins.insert(dialect, Arc::new(descriptor));

        match &replaced {
            Some(previous) => warn!(
                "Plugin '{}' replaced plugin '{}' for {}",
                id,
                previous.id(),
                dialect
            ),
            None => info!("Registered plugin '{}' for {}", id, dialect),
        }
        replaced
    }

    /// Remove the plugin of a dialect.
    pub async fn unregister(&self, dialect: Dialect) -> Option<Arc<PluginDescriptor>> {
        let removed = self.plugins.write().await.remove(&dialect);
        if let Some(plugin) = &removed {
            info!("Unregistered plugin '{}' for {}", plugin.id(), dialect);
        }
        removed
    }

    /// Get the descriptor of a dialect.
    pub async fn get(&self, dialect: Dialect) -> Result<Arc<PluginDescriptor>> {
        self.plugins
            .read()
            .await
            .get(&dialect)
            .cloned()
            .ok_or(Error::PluginNotFound(dialect))
    }

    pub async fn has_plugin(&self, dialect: Dialect) -> bool {
        self.plugins.read().await.contains_key(&dialect)
    }

    /// Registered dialects, in a stable order.
    pub async fn dialects(&self) -> Vec<Dialect> {
        let mut dialects: Vec<Dialect> = self.plugins.read().await.keys().copied().collect();
        dialects.sort();
        dialects
    }

    /// Registered descriptors, ordered by dialect.
    pub async fn descriptors(&self) -> Vec<Arc<PluginDescriptor>> {
        let mut descriptors: Vec<_> = self.plugins.read().await.values().cloned().collect();
        descriptors.sort_by_key(|d| d.dialect());
        descriptors
    }

    pub async fn connection_provider(&self, dialect: Dialect) -> Result<Arc<dyn ConnectionProvider>> {
        self.get(dialect)
            .await?
            .connection_provider()
            .ok_or(Error::CapabilityNotSupported {
                dialect,
                capability: "connection",
            })
    }

    pub async fn value_decoder(&self, dialect: Dialect) -> Result<Arc<dyn ValueDecoder>> {
        self.get(dialect)
            .await?
            .value_decoder()
            .ok_or(Error::CapabilityNotSupported {
                dialect,
                capability: "value decoding",
            })
    }

    pub async fn database_provider(&self, dialect: Dialect) -> Result<Arc<dyn DatabaseProvider>> {
        self.get(dialect)
            .await?
            .database_provider()
            .ok_or(Error::CapabilityNotSupported {
                dialect,
                capability: "DDL export/import",
            })
    }

    /// The driver specification of a dialect's plugin.
    pub async fn driver_spec(&self, dialect: Dialect) -> Result<DriverSpec> {
        self.get(dialect)
            .await?
            .driver()
            .cloned()
            .ok_or(Error::CapabilityNotSupported {
                dialect,
                capability: "driver coordinates",
            })
    }

    /// Resolve driver coordinates for a dialect.
    ///
    /// Without a version, returns the plugin's default driver. With a
    /// version, fails if the plugin does not support it.
    pub async fn driver_coordinates(
        &self,
        dialect: Dialect,
        version: Option<&str>,
    ) -> Result<PackageCoordinates> {
        self.driver_spec(dialect)
            .await?
            .resolve(version)
            .ok_or_else(|| Error::UnsupportedDriverVersion {
                dialect,
                version: version.unwrap_or_default().to_string(),
            })
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::database::traits::{RawRow, SqlType, Value};

    struct NullDecoder;

    impl ValueDecoder for NullDecoder {
        fn decode(&self, _: &dyn RawRow, _: usize, _: SqlType, _: &str) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn spec(version: &str) -> DriverSpec {
        DriverSpec::new(
            PackageCoordinates::new("org.postgresql", "postgresql", version),
            ">=42",
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_missing_plugin() {
        smol::block_on(async {
            let registry = PluginRegistry::new();
            let err = registry.get(Dialect::MySQL).await.unwrap_err();
            assert!(matches!(err, Error::PluginNotFound(Dialect::MySQL)));
            assert_eq!(err.kind(), ErrorKind::Capability);
            assert!(!registry.has_plugin(Dialect::MySQL).await);
        });
    }

    #[test]
    fn test_missing_capability() {
        smol::block_on(async {
            let registry = PluginRegistry::new();
            registry
                .register(
                    PluginDescriptor::new("pg", Dialect::PostgreSQL)
                        .with_value_decoder(Arc::new(NullDecoder)),
                )
                .await;

            assert!(registry.value_decoder(Dialect::PostgreSQL).await.is_ok());
            let err = registry
                .database_provider(Dialect::PostgreSQL)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, Error::CapabilityNotSupported { .. }));
            assert!(registry.connection_provider(Dialect::PostgreSQL).await.is_err());
            assert!(registry.driver_spec(Dialect::PostgreSQL).await.is_err());
        });
    }

    #[test]
    fn test_last_registration_wins() {
        smol::block_on(async {
            let registry = PluginRegistry::new();
            let first = registry
                .register(PluginDescriptor::new("pg-a", Dialect::PostgreSQL).with_driver(spec("42.7.2")))
                .await;
            assert!(first.is_none());

            let replaced = registry
                .register(PluginDescriptor::new("pg-b", Dialect::PostgreSQL).with_driver(spec("42.7.3")))
                .await
                .unwrap();
            assert_eq!(replaced.id(), "pg-a");

            let active = registry.get(Dialect::PostgreSQL).await.unwrap();
            assert_eq!(active.id(), "pg-b");
            assert_eq!(registry.dialects().await, vec![Dialect::PostgreSQL]);
        });
    }

    #[test]
    fn test_driver_coordinates() {
        smol::block_on(async {
            let registry = PluginRegistry::new();
            registry
                .register(PluginDescriptor::new("pg", Dialect::PostgreSQL).with_driver(spec("42.7.2")))
                .await;

            let coords = registry
                .driver_coordinates(Dialect::PostgreSQL, None)
                .await
                .unwrap();
            assert_eq!(coords.to_coordinate_string(), "org.postgresql:postgresql:42.7.2");

            let coords = registry
                .driver_coordinates(Dialect::PostgreSQL, Some("42.6.0"))
                .await
                .unwrap();
            assert_eq!(coords.version, "42.6.0");

            let err = registry
                .driver_coordinates(Dialect::PostgreSQL, Some("9.4.1212"))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::UnsupportedDriverVersion { .. }));
        });
    }

    #[test]
    fn test_unregister() {
        smol::block_on(async {
            let registry = PluginRegistry::new();
            registry
                .register(PluginDescriptor::new("pg", Dialect::PostgreSQL))
                .await;
            assert!(registry.unregister(Dialect::PostgreSQL).await.is_some());
            assert!(registry.unregister(Dialect::PostgreSQL).await.is_none());
            assert!(registry.dialects().await.is_empty());
        });
    }

    #[test]
    fn test_builtin_plugins() {
        smol::block_on(async {
            let registry = PluginRegistry::with_builtin_plugins().await.unwrap();
            assert_eq!(
                registry.dialects().await,
                vec![Dialect::MySQL, Dialect::PostgreSQL]
            );
            assert!(registry.database_provider(Dialect::MySQL).await.is_ok());
            assert!(registry.database_provider(Dialect::PostgreSQL).await.is_err());

            let coords = registry.driver_coordinates(Dialect::MySQL, None).await.unwrap();
            assert_eq!(
                coords.to_coordinate_string(),
                "com.mysql:mysql-connector-j:8.0.33"
            );
        });
    }
}
