use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{KeyValueStore, StorageError};

/// Process-local key-value store. Contents are lost when it is dropped.
pub struct InMemoryKv {
    inner: Mutex<BTreeMap<String, String>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| StorageError::Backend("mutex poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| StorageError::Backend("mutex poisoned".into()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
