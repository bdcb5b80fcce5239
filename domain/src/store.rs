//! Whole-collection persistence for links.
//!
//! The collection lives in one record of a [`KeyValueStore`] and there is no
//! partial-update API: every mutation loads the full snapshot, transforms it
//! and writes it back with [`LinkStore::save_all`].
//!
//! Lost updates: two handles (two processes, two browser tabs, two stores
//! over a shared backend) that each load, mutate and save will clobber each
//! other. The second save replaces the first in full. There is no version
//! token or merge step; callers sharing a backend across contexts accept this.

use crate::log::{EventLog, LogCategory};
use crate::{KeyValueStore, Link, StorageError};

/// Record name the collection is stored under.
pub const STORAGE_KEY: &str = "shortLinks";

pub struct LinkStore<K: KeyValueStore, L: EventLog> {
    kv: K,
    log: L,
}

impl<K: KeyValueStore, L: EventLog> LinkStore<K, L> {
    pub fn new(kv: K, log: L) -> Self {
        Self { kv, log }
    }

    /// Read the full collection. Missing record, backend failure and
    /// undecodable data all yield an empty collection; the latter two are
    /// logged. A corrupted record therefore reads as "no links".
    pub fn load_all(&self) -> Vec<Link> {
        let raw = match self.kv.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                self.log
                    .error(LogCategory::Page, &format!("Error loading links: {e}"));
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(links) => links,
            Err(e) => {
                self.log.error(
                    LogCategory::Page,
                    &format!("Stored links are unreadable, treating as empty: {e}"),
                );
                Vec::new()
            }
        }
    }

    /// Replace the persisted collection with `links`.
    pub fn save_all(&self, links: &[Link]) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(links).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(STORAGE_KEY, &raw)
    }

    pub fn find_by_shortcode(&self, code: &str) -> Option<Link> {
        self.load_all()
            .into_iter()
            .find(|link| link.shortcode.as_str() == code)
    }
}
