//! `SqlBridge`: the entry point used by the surrounding application.
//!
//! Wires the plugin registry, the driver service, the connection manager and
//! the execution engine together, and exposes the operations callers need:
//! owned connections, statement execution, DDL export and script import,
//! plus driver management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::Result;
use crate::services::database::{
    ConnectionConfigSource, ConnectionKey, ConnectionManager, OwnedConnection, PluginRegistry,
    SqlCommandRequest, SqlCommandResult, SqlExecutor, UserId,
};
use crate::services::database::traits::{Dialect, SessionHandle};
use crate::services::drivers::{AvailableDriver, DownloadedDriver, DriverService, InstalledDriver};

pub struct SqlBridge {
    registry: Arc<PluginRegistry>,
    drivers: Arc<DriverService>,
    connections: ConnectionManager,
    executor: SqlExecutor,
}

impl SqlBridge {
    /// Build a bridge with the built-in plugins.
    pub async fn new(config: &CoreConfig, configs: Arc<dyn ConnectionConfigSource>) -> Result<Self> {
        let registry = Arc::new(PluginRegistry::with_builtin_plugins().await?);
        let drivers = Arc::new(DriverService::from_config(registry.clone(), &config.drivers));
        info!(
            "Driver storage at {}, repository {}",
            config.drivers.storage_dir.display(),
            config.drivers.repository_url
        );
        Ok(Self::with_parts(
            registry,
            drivers,
            configs,
            config.drivers.auto_install,
        ))
    }

    /// Build a bridge from existing components.
    pub fn with_parts(
        registry: Arc<PluginRegistry>,
        drivers: Arc<DriverService>,
        configs: Arc<dyn ConnectionConfigSource>,
        auto_install: bool,
    ) -> Self {
        let mut connections = ConnectionManager::new(registry.clone(), configs);
        if auto_install {
            connections = connections.with_driver_installation(drivers.clone());
        }
        Self {
            executor: SqlExecutor::new(registry.clone()),
            registry,
            drivers,
            connections,
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn drivers(&self) -> &Arc<DriverService> {
        &self.drivers
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub async fn open_owned_connection(
        &self,
        config_id: Uuid,
        database: Option<&str>,
        schema: Option<&str>,
        user: UserId,
    ) -> Result<OwnedConnection> {
        self.connections
            .open_owned_connection(config_id, database, schema, user)
            .await
    }

    pub async fn close_connection(&self, key: &ConnectionKey, user: UserId) -> Result<bool> {
        self.connections.close_connection(key, user).await
    }

    pub async fn close_user_connections(&self, user: UserId) -> usize {
        self.connections.close_user_connections(user).await
    }

    pub async fn execute_command(&self, request: &SqlCommandRequest) -> SqlCommandResult {
        self.executor.execute(request).await
    }

    /// Export a whole database as DDL text, under a `-- Database:` header.
    pub async fn export_database_ddl(&self, handle: &SessionHandle, database: &str) -> Result<String> {
        let provider = self.registry.database_provider(handle.dialect()).await?;
        let mut session = handle.lock().await;
        let ddl = provider.export_database_ddl(&mut **session, database).await?;
        Ok(format!("-- Database: {}\n\n{}", database, ddl))
    }

    pub async fn export_all_table_ddls(
        &self,
        handle: &SessionHandle,
        database: &str,
    ) -> Result<Vec<String>> {
        let provider = self.registry.database_provider(handle.dialect()).await?;
        let mut session = handle.lock().await;
        provider.export_all_table_ddls(&mut **session, database).await
    }

    pub async fn execute_sql_script(&self, handle: &SessionHandle, script: &str) -> Result<()> {
        let provider = self.registry.database_provider(handle.dialect()).await?;
        let mut session = handle.lock().await;
        provider.execute_sql_script(&mut **session, script).await
    }

    pub async fn list_available_drivers(&self, dialect: Dialect) -> Result<Vec<AvailableDriver>> {
        self.drivers.list_available_drivers(dialect).await
    }

    pub async fn list_installed_drivers(&self, dialect: Dialect) -> Result<Vec<InstalledDriver>> {
        self.drivers.list_installed_drivers(dialect).await
    }

    pub async fn download_driver(&self, dialect: Dialect, version: &str) -> Result<DownloadedDriver> {
        self.drivers.download_driver(dialect, version).await
    }

    pub async fn delete_driver(&self, dialect: Dialect, version: &str) -> Result<()> {
        self.drivers.delete_driver(dialect, version).await
    }

    /// Close every connection; call before shutting down.
    pub async fn shutdown(&self) {
        self.connections.close_all().await;
    }
}

impl std::fmt::Debug for SqlBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlBridge")
            .field("drivers", &self.drivers)
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::services::database::InMemoryConfigSource;
    use crate::services::database::testing::{Reply, ScriptedSession};
    use crate::services::drivers::{DriverStorage, HttpSettings};

    fn bridge(dir: &std::path::Path) -> SqlBridge {
        let registry = Arc::new(smol::block_on(PluginRegistry::with_builtin_plugins()).unwrap());
        let drivers = Arc::new(DriverService::new(
            registry.clone(),
            DriverStorage::new(dir),
            "http://127.0.0.1:9",
            HttpSettings::default(),
        ));
        SqlBridge::with_parts(registry, drivers, Arc::new(InMemoryConfigSource::new()), false)
    }

    #[test]
    fn test_export_database_ddl_adds_header() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge(dir.path());
        let session = ScriptedSession::new(Dialect::MySQL)
            .reply(
                "SHOW CREATE DATABASE",
                Reply::text_rows(
                    &["Database", "Create Database"],
                    &[&[Some("shop"), Some("CREATE DATABASE `shop`")]],
                ),
            )
            .reply("SELECT TABLE_NAME", Reply::text_rows(&["TABLE_NAME", "TABLE_TYPE"], &[]))
            .reply("SELECT TRIGGER_NAME", Reply::text_rows(&["TRIGGER_NAME"], &[]))
            .reply("SELECT ROUTINE_NAME", Reply::text_rows(&["ROUTINE_NAME", "ROUTINE_TYPE"], &[]));
        let handle = SessionHandle::new(session.boxed());

        let ddl = smol::block_on(bridge.export_database_ddl(&handle, "shop")).unwrap();
        assert!(ddl.starts_with("-- Database: shop\n\nCREATE DATABASE `shop`;"));
    }

    #[test]
    fn test_postgres_has_no_ddl_export() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge(dir.path());
        let handle = SessionHandle::new(ScriptedSession::new(Dialect::PostgreSQL).boxed());

        let err = smol::block_on(bridge.export_database_ddl(&handle, "app")).unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityNotSupported {
                dialect: Dialect::PostgreSQL,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Capability);
    }

    #[test]
    fn test_execute_sql_script() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge(dir.path());
        let session = ScriptedSession::new(Dialect::MySQL);
        let state = session.state();
        let handle = SessionHandle::new(session.boxed());

        smol::block_on(bridge.execute_sql_script(
            &handle,
            "CREATE TABLE a (id INT);\nINSERT INTO a VALUES (1);",
        ))
        .unwrap();
        assert_eq!(state.lock().unwrap().executed.len(), 2);
    }

    #[test]
    fn test_no_drivers_installed() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge(dir.path());
        let installed = smol::block_on(bridge.list_installed_drivers(Dialect::MySQL)).unwrap();
        assert!(installed.is_empty());

        let err = smol::block_on(bridge.delete_driver(Dialect::MySQL, "8.0.33")).unwrap_err();
        assert!(matches!(err, Error::DriverNotInstalled { .. }));
    }
}
