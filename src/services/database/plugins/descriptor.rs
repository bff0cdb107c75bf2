//! Plugin descriptors: a dialect bound to its capability set.

use std::sync::Arc;

use crate::services::database::traits::{
    ConnectionProvider, DatabaseProvider, Dialect, ValueDecoder,
};
use crate::services::drivers::DriverSpec;

/// Binds a dialect to the capabilities a plugin implements for it.
///
/// Every capability is optional; the registry reports a missing one as
/// `CapabilityNotSupported`.
///
/// # Example
///
/// ```ignore
/// let descriptor = PluginDescriptor::new("mysql", Dialect::MySQL)
///     .with_driver(spec)
///     .with_connection_provider(Arc::new(MySqlConnectionProvider))
///     .with_value_decoder(Arc::new(MySqlValueDecoder));
/// registry.register(descriptor).await;
/// ```
#[derive(Clone)]
pub struct PluginDescriptor {
    id: String,
    dialect: Dialect,
    driver: Option<DriverSpec>,
    connection_provider: Option<Arc<dyn ConnectionProvider>>,
    value_decoder: Option<Arc<dyn ValueDecoder>>,
    database_provider: Option<Arc<dyn DatabaseProvider>>,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            id: id.into(),
            dialect,
            driver: None,
            connection_provider: None,
            value_decoder: None,
            database_provider: None,
        }
    }

    pub fn with_driver(mut self, driver: DriverSpec) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_connection_provider(mut self, provider: Arc<dyn ConnectionProvider>) -> Self {
        self.connection_provider = Some(provider);
        self
    }

    pub fn with_value_decoder(mut self, decoder: Arc<dyn ValueDecoder>) -> Self {
        self.value_decoder = Some(decoder);
        self
    }

    pub fn with_database_provider(mut self, provider: Arc<dyn DatabaseProvider>) -> Self {
        self.database_provider = Some(provider);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn driver(&self) -> Option<&DriverSpec> {
        self.driver.as_ref()
    }

    pub fn connection_provider(&self) -> Option<Arc<dyn ConnectionProvider>> {
        self.connection_provider.clone()
    }

    pub fn value_decoder(&self) -> Option<Arc<dyn ValueDecoder>> {
        self.value_decoder.clone()
    }

    pub fn database_provider(&self) -> Option<Arc<dyn DatabaseProvider>> {
        self.database_provider.clone()
    }

    /// Names of the capabilities this plugin implements.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut caps = Vec::new();
        if self.driver.is_some() {
            caps.push("driver");
        }
        if self.connection_provider.is_some() {
            caps.push("connection");
        }
        if self.value_decoder.is_some() {
            caps.push("value-decoder");
        }
        if self.database_provider.is_some() {
            caps.push("database-provider");
        }
        caps
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("dialect", &self.dialect)
            .field("driver", &self.driver)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
