//! Connection ownership manager.
//!
//! Keeps one live session per `(config id, database, schema)` and remembers
//! which user opened it. Only that user may reuse or close it. Opening the
//! same key concurrently is serialized per key; different keys never wait on
//! each other.

use std::collections::HashMap;
use std::sync::Arc;

use async_lock::{Mutex, RwLock};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::plugins::PluginRegistry;
use super::traits::{ConnectionConfig, Dialect, SessionHandle};
use crate::error::{Error, Result};
use crate::services::drivers::DriverService;

/// Identifier of the user owning a connection.
pub type UserId = i64;

/// Identity of a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionKey {
    pub config_id: Uuid,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl ConnectionKey {
    pub fn new(config_id: Uuid, database: Option<&str>, schema: Option<&str>) -> Self {
        Self {
            config_id,
            database: database.map(str::to_string),
            schema: schema.map(str::to_string),
        }
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.config_id,
            self.database.as_deref().unwrap_or("-"),
            self.schema.as_deref().unwrap_or("-")
        )
    }
}

/// A live connection and the user it belongs to.
#[derive(Debug, Clone)]
pub struct OwnedConnection {
    pub key: ConnectionKey,
    pub owner: UserId,
    pub dialect: Dialect,
    pub plugin_id: String,
    pub handle: SessionHandle,
}

/// Where saved connection definitions come from.
#[async_trait]
pub trait ConnectionConfigSource: Send + Sync {
    async fn get_config(&self, id: Uuid) -> Result<Option<ConnectionConfig>>;
}

/// Connection definitions held in memory.
#[derive(Debug, Default)]
pub struct InMemoryConfigSource {
    configs: RwLock<HashMap<Uuid, ConnectionConfig>>,
}

impl InMemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, config: ConnectionConfig) -> Result<()> {
        config.validate()?;
        self.configs.write().await.insert(config.id, config);
        Ok(())
    }

    pub async fn remove(&self, id: Uuid) -> Option<ConnectionConfig> {
        self.configs.write().await.remove(&id)
    }
}

#[async_trait]
impl ConnectionConfigSource for InMemoryConfigSource {
    async fn get_config(&self, id: Uuid) -> Result<Option<ConnectionConfig>> {
        Ok(self.configs.read().await.get(&id).cloned())
    }
}

/// Owns every live connection of the process.
pub struct ConnectionManager {
    registry: Arc<PluginRegistry>,
    configs: Arc<dyn ConnectionConfigSource>,
    /// Installs a missing driver before a dialect's first connection
    drivers: Option<Arc<DriverService>>,
    connections: RwLock<HashMap<ConnectionKey, OwnedConnection>>,
    open_locks: Mutex<HashMap<ConnectionKey, Arc<Mutex<()>>>>,
}

impl ConnectionManager {
    pub fn new(registry: Arc<PluginRegistry>, configs: Arc<dyn ConnectionConfigSource>) -> Self {
        Self {
            registry,
            configs,
            drivers: None,
            connections: RwLock::new(HashMap::new()),
            open_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Make sure a dialect's driver is installed before connecting to it.
    pub fn with_driver_installation(mut self, drivers: Arc<DriverService>) -> Self {
        self.drivers = Some(drivers);
        self
    }

    /// Return the caller's live connection for this key, opening it first
    /// if there is none.
    ///
    /// # Errors
    ///
    /// - `OwnershipViolation` if another user owns the connection
    /// - `ConnectionConfigNotFound` if the config id is unknown
    /// - a Capability error if the dialect has no connectivity plugin
    /// - a Connectivity error if the server cannot be reached
    pub async fn open_owned_connection(
        &self,
        config_id: Uuid,
        database: Option<&str>,
        schema: Option<&str>,
        user: UserId,
    ) -> Result<OwnedConnection> {
        let key = ConnectionKey::new(config_id, database, schema);
        if let Some(existing) = self.get_owned_connection(&key, user).await? {
            return Ok(existing);
        }

        let lock = self.open_lock(&key).await;
        let opened = {
            let _guard = lock.lock().await;
            self.open_locked(&key, user).await
        };
        self.release_open_lock(&key, lock).await;
        opened
    }

    /// Open `key` for `user`; the caller holds the key's open lock.
    async fn open_locked(&self, key: &ConnectionKey, user: UserId) -> Result<OwnedConnection> {
        // another request may have opened it while we waited
        if let Some(existing) = self.get_owned_connection(key, user).await? {
            return Ok(existing);
        }

        let config_id = key.config_id;
        let config = self
            .configs
            .get_config(config_id)
            .await?
            .ok_or_else(|| Error::ConnectionConfigNotFound(config_id.to_string()))?;
        let plugin = self.registry.get(config.dialect).await?;

        if let Some(drivers) = &self.drivers {
            if plugin.driver().is_some() {
                let path = drivers.ensure_driver_installed(config.dialect).await?;
                debug!("Using {} driver at {}", config.dialect, path.display());
            }
        }

        let provider = self.registry.connection_provider(config.dialect).await?;
        let session = provider
            .connect(&config, key.database.as_deref(), key.schema.as_deref())
            .await?;

        let mut connections = self.connections.write().await;
        if let Some(existing) = connections.get(key).cloned() {
            drop(connections);
            if let Err(e) = session.close().await {
                warn!("Failed to close surplus connection {}: {}", key, e);
            }
            if existing.owner != user {
                return Err(Error::OwnershipViolation {
                    key: key.to_string(),
                });
            }
            return Ok(existing);
        }

        let connection = OwnedConnection {
            key: key.clone(),
            owner: user,
            dialect: config.dialect,
            plugin_id: plugin.id().to_string(),
            handle: SessionHandle::new(session),
        };
        connections.insert(key.clone(), connection.clone());
        drop(connections);

        info!(
            "Opened {} connection {} for user {}",
            config.dialect, key, user
        );
        Ok(connection)
    }

    /// Look up a live connection without opening one.
    pub async fn get_owned_connection(
        &self,
        key: &ConnectionKey,
        user: UserId,
    ) -> Result<Option<OwnedConnection>> {
        match self.connections.read().await.get(key) {
            Some(conn) if conn.owner != user => Err(Error::OwnershipViolation {
                key: key.to_string(),
            }),
            Some(conn) => Ok(Some(conn.clone())),
            None => Ok(None),
        }
    }

    /// Close the caller's connection for this key.
    ///
    /// Returns `false` if no connection was open.
    pub async fn close_connection(&self, key: &ConnectionKey, user: UserId) -> Result<bool> {
        let removed = {
            let mut connections = self.connections.write().await;
            match connections.get(key) {
                Some(conn) if conn.owner != user => {
                    return Err(Error::OwnershipViolation {
                        key: key.to_string(),
                    });
                }
                Some(_) => connections.remove(key),
                None => None,
            }
        };

        match removed {
            Some(conn) => {
                Self::close_handle(conn).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every connection owned by `user`, e.g. when their session ends.
    pub async fn close_user_connections(&self, user: UserId) -> usize {
        let removed: Vec<OwnedConnection> = {
            let mut connections = self.connections.write().await;
            let keys: Vec<ConnectionKey> = connections
                .iter()
                .filter(|(_, conn)| conn.owner == user)
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| connections.remove(key)).collect()
        };

        let count = removed.len();
        for conn in removed {
            Self::close_handle(conn).await;
        }
        if count > 0 {
            info!("Closed {} connection(s) of user {}", count, user);
        }
        count
    }

    /// Close every connection.
    pub async fn close_all(&self) {
        let removed: Vec<OwnedConnection> =
            self.connections.write().await.drain().map(|(_, c)| c).collect();
        for conn in removed {
            Self::close_handle(conn).await;
        }
    }

    /// Live connections, ordered by key.
    pub async fn active_connections(&self) -> Vec<OwnedConnection> {
        let mut connections: Vec<OwnedConnection> =
            self.connections.read().await.values().cloned().collect();
        connections.sort_by(|a, b| a.key.cmp(&b.key));
        connections
    }

    async fn open_lock(&self, key: &ConnectionKey) -> Arc<Mutex<()>> {
        let mut locks = self.open_locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the key's open lock once no other opener holds it.
    async fn release_open_lock(&self, key: &ConnectionKey, lock: Arc<Mutex<()>>) {
        let mut locks = self.open_locks.lock().await;
        // new holders only appear under `open_locks`, so the count is stable here
        let idle = locks.get(key).is_some_and(|held| Arc::ptr_eq(held, &lock))
            && Arc::strong_count(&lock) == 2;
        if idle {
            locks.remove(key);
        }
    }

    async fn close_handle(conn: OwnedConnection) {
        let key = conn.key;
        match conn.handle.close().await {
            Ok(true) => info!("Closed connection {}", key),
            Ok(false) => debug!("Connection {} still in use, closing when released", key),
            Err(e) => warn!("Failed to close connection {}: {}", key, e),
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("auto_install", &self.drivers.is_some())
            .finish_non_exhaustive()
    }
}
