//! Schema registry service
//!
//! Holds the named level lists domain trees are bound to. The whole registry
//! is one JSON object stored under a single key, mapping template name to
//! its ordered level list. Every mutation writes the complete next record
//! through to the store before the in-memory cache is replaced.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt, JsonResultExt};
use crate::domain::{check_levels, LevelsError, SchemaTemplate};
use crate::infrastructure::traits::KeyValueStore;

type Record = BTreeMap<String, Vec<String>>;

/// Write-through registry of schema templates.
pub struct SchemaRegistry {
    store: Arc<dyn KeyValueStore>,
    key: String,
    cache: RwLock<Record>,
}

impl SchemaRegistry {
    /// Create a registry over `store`, reading the current record under `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> ApplicationResult<Self> {
        let key = key.into();
        let cache = Self::read_record(store.as_ref(), &key)?;
        debug!("new: {} template(s) under {}", cache.len(), key);
        Ok(Self {
            store,
            key,
            cache: RwLock::new(cache),
        })
    }

    fn read_record(store: &dyn KeyValueStore, key: &str) -> ApplicationResult<Record> {
        match store.get(key).with_key_context("read schema registry", key)? {
            Some(bytes) => parse_record(&bytes),
            None => Ok(Record::new()),
        }
    }

    fn snapshot(&self) -> Record {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `change` to a copy of the record, persist it, then swap the cache.
    fn write_through<T>(
        &self,
        change: impl FnOnce(&mut Record) -> ApplicationResult<T>,
    ) -> ApplicationResult<T> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = cache.clone();
        let result = change(&mut next)?;
        let bytes = serde_json::to_vec_pretty(&next).with_key_context("encode schema registry", &self.key)?;
        self.store
            .set(&self.key, &bytes)
            .with_key_context("write schema registry", &self.key)?;
        *cache = next;
        Ok(result)
    }

    /// Install a new template with no levels.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, name: &str) -> ApplicationResult<()> {
        self.write_through(|record| {
            if record.contains_key(name) {
                return Err(ApplicationError::AlreadyExists(name.to_string()));
            }
            record.insert(name.to_string(), Vec::new());
            Ok(())
        })?;
        info!("Created schema {}", name);
        Ok(())
    }

    /// Levels of a template, empty if the template does not exist.
    pub fn get_levels(&self, name: &str) -> Vec<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// The template named `name`, failing if it does not exist.
    pub fn template(&self, name: &str) -> ApplicationResult<SchemaTemplate> {
        let levels = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound(format!("schema '{}'", name)))?;
        SchemaTemplate::new(name, levels).map_err(|source| ApplicationError::InvalidLevels {
            name: name.to_string(),
            source,
        })
    }

    /// Replace the level list of an existing template wholesale.
    #[instrument(level = "debug", skip(self))]
    pub fn replace_levels(&self, name: &str, levels: Vec<String>) -> ApplicationResult<()> {
        check_levels(&levels).map_err(|source| ApplicationError::InvalidLevels {
            name: name.to_string(),
            source,
        })?;
        let joined = levels.iter().join(" > ");
        self.write_through(|record| {
            let slot = record
                .get_mut(name)
                .ok_or_else(|| ApplicationError::NotFound(format!("schema '{}'", name)))?;
            *slot = levels;
            Ok(())
        })?;
        info!("Schema {} levels: {}", name, joined);
        Ok(())
    }

    /// Remove a template, returning its levels if it existed.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, name: &str) -> ApplicationResult<Option<Vec<String>>> {
        if !self.contains(name) {
            return Ok(None);
        }
        self.write_through(|record| Ok(record.remove(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    /// Re-read the record from the store, dropping the cached state.
    pub fn reload(&self) -> ApplicationResult<()> {
        let record = Self::read_record(self.store.as_ref(), &self.key)?;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = record;
        Ok(())
    }

    /// Replace the whole registry with a serialized record.
    #[instrument(level = "debug", skip_all, fields(len = bytes.len()))]
    pub fn load_record(&self, bytes: &[u8]) -> ApplicationResult<()> {
        let record = parse_record(bytes)?;
        let count = record.len();
        self.write_through(move |current| {
            *current = record;
            Ok(())
        })?;
        info!("Loaded {} schema template(s)", count);
        Ok(())
    }
}

/// Parse a registry record: a JSON object mapping names to string lists.
fn parse_record(bytes: &[u8]) -> ApplicationResult<Record> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ApplicationError::InvalidDomainStruct(format!("schema registry: {}", e)))?;
    let serde_json::Value::Object(entries) = value else {
        return Err(ApplicationError::InvalidDomainStruct(
            "schema registry must be a JSON object".to_string(),
        ));
    };

    let mut record = Record::new();
    for (name, levels) in entries {
        let invalid = |source| ApplicationError::InvalidLevels {
            name: name.clone(),
            source,
        };
        let levels: Vec<String> =
            serde_json::from_value(levels).map_err(|_| invalid(LevelsError::NotAList))?;
        check_levels(&levels).map_err(invalid)?;
        record.insert(name, levels);
    }
    Ok(record)
}
