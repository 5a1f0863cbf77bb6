//! Session factories
//!
//! A `SessionFactory` owns the connection to one cluster and the cache of
//! domain type handlers built for it. Handlers are expensive to build (they
//! analyse every field against the dictionary) and immutable once built, so
//! they are built once per factory and shared by every session.
//!
//! ## Handler cache
//!
//! The cache is a single `parking_lot::Mutex` around a map. Lookup, build
//! and insert all happen under the lock, so two sessions asking for the same
//! type never build it twice and never observe a half-built handler. Entries
//! are only removed by `invalidate` / `invalidate_all`, typically after a
//! schema change.

mod config;
mod registry;

pub use config::{SessionFactoryConfig, CONFIG_FILE_NAME};
pub use registry::OPEN_FACTORIES;

use clusterbind_core::{Error, Result};
use clusterbind_metadata::{DomainTypeHandler, NullValue, TypeMapping};
use clusterbind_storage::{Cluster, Dictionary, LockMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::session::Session;

/// Cache key prefix for handlers derived from a table
const TABLE_KEY_PREFIX: &str = "table:";

/// Connection to one cluster plus its domain type handler cache
pub struct SessionFactory {
    config: SessionFactoryConfig,
    cluster: Arc<Cluster>,
    lock_mode: LockMode,
    null_value: NullValue,
    mappings: Mutex<HashMap<String, TypeMapping>>,
    handlers: Mutex<HashMap<String, Arc<DomainTypeHandler>>>,
    registered: bool,
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("cluster", &self.cluster.name())
            .field("database", &self.config.database)
            .field("cached_handlers", &self.handlers.lock().len())
            .finish()
    }
}

impl SessionFactory {
    /// Open (or return the already open) factory for the configured cluster
    pub fn open(config: SessionFactoryConfig) -> Result<Arc<Self>> {
        config.validate()?;
        // Held across check and create so one cluster name never gets two
        // factories.
        let mut registry = OPEN_FACTORIES.lock();
        if let Some(existing) = registry.get(&config.cluster_name).and_then(|w| w.upgrade()) {
            info!(target: "clusterbind::session", cluster = %config.cluster_name, "Returning existing session factory");
            return Ok(existing);
        }

        let cluster = Arc::new(Cluster::new(config.cluster_name.clone(), config.partition_count));
        let factory = Arc::new(Self::build(config, cluster, true)?);
        registry.insert(factory.config.cluster_name.clone(), Arc::downgrade(&factory));
        info!(
            target: "clusterbind::session",
            cluster = %factory.config.cluster_name,
            database = %factory.config.database,
            "Session factory opened"
        );
        Ok(factory)
    }

    /// Open a factory from a `clusterbind.toml` file
    pub fn open_file(path: &Path) -> Result<Arc<Self>> {
        Self::open(SessionFactoryConfig::from_file(path)?)
    }

    /// Factory over an existing cluster, outside the process-wide registry
    pub fn with_cluster(config: SessionFactoryConfig, cluster: Arc<Cluster>) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self::build(config, cluster, false)?))
    }

    fn build(config: SessionFactoryConfig, cluster: Arc<Cluster>, registered: bool) -> Result<Self> {
        Ok(Self {
            lock_mode: config.lock_mode()?,
            null_value: config.null_value()?,
            config,
            cluster,
            mappings: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
            registered,
        })
    }

    /// Configuration the factory was opened with
    pub fn config(&self) -> &SessionFactoryConfig {
        &self.config
    }

    /// The cluster
    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    /// The cluster's dictionary
    pub fn dictionary(&self) -> &Dictionary {
        self.cluster.dictionary()
    }

    /// Lock mode for reads
    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    /// New session
    pub fn open_session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self))
    }

    // ------------------------------------------------------------------------
    // Handler cache
    // ------------------------------------------------------------------------

    /// Register a mapping and return its handler
    ///
    /// Fields without their own null-value policy get the factory's.
    /// Registering the same type name again returns the cached handler.
    pub fn register(&self, mapping: TypeMapping) -> Result<Arc<DomainTypeHandler>> {
        let mapping = if mapping.declared_null_value().is_none() {
            mapping.default_null_value(self.null_value)
        } else {
            mapping
        };
        let name = mapping.type_name().to_string();
        let mut handlers = self.handlers.lock();
        if let Some(handler) = handlers.get(&name) {
            return Ok(Arc::clone(handler));
        }
        let handler = Arc::new(DomainTypeHandler::new(&mapping, self.dictionary())?);
        self.mappings.lock().insert(name.clone(), mapping);
        handlers.insert(name, Arc::clone(&handler));
        Ok(handler)
    }

    /// Handler of a registered type
    ///
    /// A type whose handler was invalidated is rebuilt from its mapping.
    pub fn handler(&self, type_name: &str) -> Result<Arc<DomainTypeHandler>> {
        let mut handlers = self.handlers.lock();
        if let Some(handler) = handlers.get(type_name) {
            return Ok(Arc::clone(handler));
        }
        let mapping = self
            .mappings
            .lock()
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::user(format!("Type {} is not registered", type_name)))?;
        debug!(target: "clusterbind::session", type_name, "Rebuilding domain type handler");
        let handler = Arc::new(DomainTypeHandler::new(&mapping, self.dictionary())?);
        handlers.insert(type_name.to_string(), Arc::clone(&handler));
        Ok(handler)
    }

    /// Handler derived from a table, one field per column
    pub fn table_handler(&self, table: &str) -> Result<Arc<DomainTypeHandler>> {
        let key = format!("{}{}", TABLE_KEY_PREFIX, table);
        let mut handlers = self.handlers.lock();
        if let Some(handler) = handlers.get(&key) {
            return Ok(Arc::clone(handler));
        }
        let handler = Arc::new(DomainTypeHandler::for_table(table, self.dictionary())?);
        handlers.insert(key, Arc::clone(&handler));
        Ok(handler)
    }

    /// Drop the cached handlers of a type and of the table it maps
    ///
    /// Returns whether anything was evicted. Sessions holding the old
    /// handler keep using it.
    pub fn invalidate(&self, name: &str) -> bool {
        let mut handlers = self.handlers.lock();
        let table = handlers.get(name).map(|h| h.table().name.clone());
        let mut evicted = handlers.remove(name).is_some();
        let table = table.unwrap_or_else(|| name.to_string());
        evicted |= handlers
            .remove(&format!("{}{}", TABLE_KEY_PREFIX, table))
            .is_some();
        if evicted {
            info!(target: "clusterbind::session", name, "Domain type handler invalidated");
        }
        evicted
    }

    /// Drop every cached handler
    pub fn invalidate_all(&self) {
        let mut handlers = self.handlers.lock();
        let count = handlers.len();
        handlers.clear();
        info!(target: "clusterbind::session", count, "All domain type handlers invalidated");
    }

    /// Number of cached handlers
    pub fn cached_handlers(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl Drop for SessionFactory {
    fn drop(&mut self) {
        if !self.registered {
            return;
        }
        let mut registry = OPEN_FACTORIES.lock();
        let dead = registry
            .get(&self.config.cluster_name)
            .map_or(false, |w| w.upgrade().is_none());
        if dead {
            registry.remove(&self.config.cluster_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterbind_core::{ColumnDescriptor, ColumnType, FieldType};
    use clusterbind_metadata::FieldMapping;
    use clusterbind_storage::TableBuilder;

    fn factory(name: &str) -> Arc<SessionFactory> {
        let factory = SessionFactory::open(SessionFactoryConfig::for_cluster(name)).unwrap();
        factory
            .cluster()
            .create_table(
                TableBuilder::new("employee")
                    .column(ColumnDescriptor::new("id", ColumnType::Int))
                    .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
                    .primary_key(&["id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        factory
    }

    fn mapping() -> TypeMapping {
        TypeMapping::new("Employee", "employee")
            .field(FieldMapping::new("id", FieldType::INT))
            .field(FieldMapping::new("name", FieldType::STRING))
    }

    #[test]
    fn test_one_factory_per_cluster() {
        let a = factory("factory-singleton");
        let b = SessionFactory::open(SessionFactoryConfig::for_cluster("factory-singleton")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        drop(a);
        drop(b);
        assert!(!OPEN_FACTORIES.lock().contains_key("factory-singleton"));
    }

    #[test]
    fn test_handler_cached_once() {
        let factory = factory("factory-cache");
        let first = factory.register(mapping()).unwrap();
        let second = factory.handler("Employee").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.cached_handlers(), 1);
    }

    #[test]
    fn test_invalidate_rebuilds() {
        let factory = factory("factory-invalidate");
        let first = factory.register(mapping()).unwrap();
        factory.table_handler("employee").unwrap();
        assert_eq!(factory.cached_handlers(), 2);
        assert!(factory.invalidate("Employee"));
        assert_eq!(factory.cached_handlers(), 0);
        let rebuilt = factory.handler("Employee").unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert!(!factory.invalidate("Unknown"));
    }

    #[test]
    fn test_unregistered_type() {
        let factory = factory("factory-unregistered");
        assert!(factory.handler("Nope").is_err());
    }

    #[test]
    fn test_factory_null_policy_applies() {
        let config = SessionFactoryConfig {
            null_value: "exception".to_string(),
            ..SessionFactoryConfig::for_cluster("factory-null-policy")
        };
        let factory = SessionFactory::open(config).unwrap();
        factory
            .cluster()
            .create_table(
                TableBuilder::new("employee")
                    .column(ColumnDescriptor::new("id", ColumnType::Int))
                    .column(ColumnDescriptor::new("name", ColumnType::Varchar).with_length(32))
                    .primary_key(&["id"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let handler = factory.register(mapping()).unwrap();
        assert_eq!(handler.field(1).unwrap().null_value(), NullValue::Exception);
    }
}
