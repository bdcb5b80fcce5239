//! Storage backend selection: in-memory or SQLite (feature-gated).

use domain::adapters::memory_kv::InMemoryKv;
use domain::{KeyValueStore, StorageError};

use crate::config::{Config, StorageProvider};

pub enum AnyKv {
    Memory(InMemoryKv),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteKv),
}

impl AnyKv {
    pub fn memory() -> Self {
        Self::Memory(InMemoryKv::new())
    }

    pub fn from_config(cfg: &Config) -> Result<Self, StorageError> {
        match cfg.storage_provider {
            StorageProvider::Memory => {
                tracing::warn!(
                    "STORAGE_PROVIDER=memory: links are discarded when the command exits"
                );
                Ok(Self::memory())
            }
            #[cfg(feature = "sqlite")]
            StorageProvider::Sqlite => {
                Ok(Self::Sqlite(sqlite_adapter::SqliteKv::open(&cfg.db_path)?))
            }
            #[cfg(not(feature = "sqlite"))]
            StorageProvider::Sqlite => Err(StorageError::Backend(
                "built without the `sqlite` feature; set STORAGE_PROVIDER=memory".into(),
            )),
        }
    }
}

impl KeyValueStore for AnyKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            AnyKv::Memory(kv) => kv.get(key),
            #[cfg(feature = "sqlite")]
            AnyKv::Sqlite(kv) => kv.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            AnyKv::Memory(kv) => kv.set(key, value),
            #[cfg(feature = "sqlite")]
            AnyKv::Sqlite(kv) => kv.set(key, value),
        }
    }
}
