//! Service container for dependency injection
//!
//! Wires settings, the key-value store and the services built on it.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{DomainRepository, SchemaRegistry};
use crate::config::Settings;
use crate::infrastructure::traits::{FileStore, KeyValueStore, MemoryStore};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Backing key-value store
    pub store: Arc<dyn KeyValueStore>,

    schemas: Arc<SchemaRegistry>,
    domains: DomainRepository,
}

impl ServiceContainer {
    /// Create a container over the file store at `settings.store_dir`.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let store = Arc::new(FileStore::new(settings.store_dir.clone()));
        Self::with_store(settings, store)
    }

    /// Create a container over a fresh, ephemeral store.
    pub fn in_memory(settings: Settings) -> InfraResult<Self> {
        Self::with_store(settings, Arc::new(MemoryStore::new()))
    }

    /// Create a container with a custom store (for testing).
    pub fn with_store(settings: Settings, store: Arc<dyn KeyValueStore>) -> InfraResult<Self> {
        let settings = Arc::new(settings);
        let schemas = Arc::new(SchemaRegistry::new(
            Arc::clone(&store),
            settings.schema_key.clone(),
        )?);
        let domains = DomainRepository::new(
            Arc::clone(&store),
            Arc::clone(&schemas),
            settings.domain_prefix.clone(),
        );
        debug!("ServiceContainer ready, {} schema(s)", schemas.names().len());

        Ok(Self {
            settings,
            store,
            schemas,
            domains,
        })
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn domains(&self) -> &DomainRepository {
        &self.domains
    }
}
