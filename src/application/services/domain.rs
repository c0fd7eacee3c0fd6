//! Domain persistence service
//!
//! Stores each domain tree as one JSON document under `<prefix><name>`.
//! Saves are optimistic: a save only goes through if the stored version is
//! still the one the in-memory tree was loaded with.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::application::services::SchemaRegistry;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt, JsonResultExt};
use crate::domain::{DomainDocument, DomainTree};
use crate::infrastructure::traits::KeyValueStore;

/// Just enough of a stored document to compare versions.
#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: u64,
}

/// Loads, saves and deletes domain trees.
pub struct DomainRepository {
    store: Arc<dyn KeyValueStore>,
    schemas: Arc<SchemaRegistry>,
    prefix: String,
}

impl DomainRepository {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        schemas: Arc<SchemaRegistry>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            schemas,
            prefix: prefix.into(),
        }
    }

    /// Store key of a domain.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// A new, unsaved, empty domain bound to an existing schema.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, name: &str, schema: &str) -> ApplicationResult<DomainTree> {
        let key = self.key(name);
        if self.store.get(&key).with_key_context("read domain", &key)?.is_some() {
            return Err(ApplicationError::AlreadyExists(format!("domain '{}'", name)));
        }
        let template = self.schemas.template(schema)?;
        Ok(DomainTree::new(name, template))
    }

    /// Persist `tree` with a single compare-and-set attempt.
    ///
    /// On success the tree carries the new version and timestamp. On
    /// conflict nothing is written and the tree is left as it was.
    #[instrument(level = "debug", skip_all, fields(domain = %tree.name(), version = tree.version()))]
    pub fn save(&self, tree: &mut DomainTree) -> ApplicationResult<u64> {
        let key = self.key(tree.name());
        if let Some(bytes) = self.store.get(&key).with_key_context("read domain", &key)? {
            let stored: VersionProbe =
                serde_json::from_slice(&bytes).with_key_context("decode stored version", &key)?;
            if stored.version != tree.version() {
                warn!(
                    "save: {} is at version {}, tree was loaded at {}",
                    key,
                    stored.version,
                    tree.version()
                );
                return Err(ApplicationError::OptimisticConflict {
                    key,
                    expected: tree.version(),
                    found: stored.version,
                });
            }
        }

        let next = tree.version() + 1;
        let now = Utc::now();
        let mut doc = tree.to_document();
        doc.version = next;
        doc.timestamp = now;
        let bytes = serde_json::to_vec_pretty(&doc).with_key_context("encode domain", &key)?;
        self.store
            .set(&key, &bytes)
            .with_key_context("write domain", &key)?;
        tree.mark_saved(next, now);
        info!("Saved {} at version {}", key, next);
        Ok(next)
    }

    /// Load and validate a stored domain.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, name: &str) -> ApplicationResult<Option<DomainTree>> {
        let key = self.key(name);
        let Some(bytes) = self.fetch(name)? else {
            debug!("load: nothing stored under {}", key);
            return Ok(None);
        };
        let doc: DomainDocument =
            serde_json::from_slice(&bytes).with_key_context("decode domain", &key)?;
        Self::check_name(&doc, name)?;
        self.bind(&doc).map(Some)
    }

    /// Raw stored document.
    pub fn fetch(&self, name: &str) -> ApplicationResult<Option<Vec<u8>>> {
        let key = self.key(name);
        self.store.get(&key).with_key_context("read domain", &key)
    }

    /// Build a tree from an external document and persist it.
    ///
    /// The document's version is the version the save expects to find.
    #[instrument(level = "debug", skip(self, bytes), fields(len = bytes.len()))]
    pub fn import(&self, name: &str, bytes: &[u8]) -> ApplicationResult<DomainTree> {
        let doc: DomainDocument = serde_json::from_slice(bytes)
            .map_err(|e| ApplicationError::InvalidDomainStruct(format!("domain '{}': {}", name, e)))?;
        Self::check_name(&doc, name)?;
        let mut tree = self.bind(&doc)?;
        self.save(&mut tree)?;
        Ok(tree)
    }

    /// Remove a stored domain, returning its last document.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, name: &str) -> ApplicationResult<Option<Vec<u8>>> {
        let key = self.key(name);
        let previous = self
            .store
            .delete(&key)
            .with_key_context("delete domain", &key)?;
        if previous.is_some() {
            info!("Deleted {}", key);
        }
        Ok(previous)
    }

    /// Names of all stored domains, sorted.
    pub fn names(&self) -> ApplicationResult<Vec<String>> {
        let keys = self
            .store
            .keys(&self.prefix)
            .with_key_context("list domains", &self.prefix)?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    /// A document is only valid under the key of its own name.
    fn check_name(doc: &DomainDocument, name: &str) -> ApplicationResult<()> {
        if doc.name != name {
            return Err(ApplicationError::InvalidDomainStruct(format!(
                "document describes domain '{}', not '{}'",
                doc.name, name
            )));
        }
        Ok(())
    }

    fn bind(&self, doc: &DomainDocument) -> ApplicationResult<DomainTree> {
        let template = self.schemas.template(&doc.schema)?;
        Ok(DomainTree::from_document(doc, template)?)
    }
}
