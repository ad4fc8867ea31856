//! Store facade: one index bound to one snapshot file.
//!
//! `Store` pairs a `SkipList<String, Value>` with the `Config` it was built
//! from. Opening loads the configured snapshot if it exists; `save` writes it
//! back. Everything in between is plain index access.

use std::path::Path;

use crate::config::Config;
use crate::error::KvResult;
use crate::skiplist::SkipList;
use crate::snapshot::{dump_file, load_file, SnapshotStats};
use crate::value::Value;

/// String-keyed store of dynamic values with explicit snapshots.
///
/// All methods take `&self`; the index does its own locking.
pub struct Store {
    index: SkipList<String, Value>,
    config: Config,
}

impl Store {
    /// Build an empty index and load `config.snapshot_path` if present.
    pub fn open(config: Config) -> KvResult<Self> {
        let index = SkipList::with_config(&config)?;

        if config.snapshot_path.exists() {
            let stats = load_file(&index, &config.snapshot_path)?;
            log::debug!(
                "[SkipKV] Restored {} entries from {} ({} lines skipped)",
                stats.entries,
                config.snapshot_path.display(),
                stats.skipped
            );
        }

        Ok(Self { index, config })
    }

    /// Add an entry; an existing key gains a second entry.
    pub fn insert<K: Into<String>, V: Into<Value>>(&self, key: K, value: V) -> bool {
        self.index.insert(key.into(), value.into())
    }

    pub fn update<V: Into<Value>>(&self, key: &str, value: V) -> bool {
        self.index.update(key, value.into())
    }

    pub fn delete(&self, key: &str) -> bool {
        self.index.delete(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.index.find(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Write the whole index to the configured snapshot path.
    pub fn save(&self) -> KvResult<SnapshotStats> {
        dump_file(&self.index, &self.config.snapshot_path, self.config.sync_on_dump)
    }

    pub fn index(&self) -> &SkipList<String, Value> {
        &self.index
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.config.snapshot_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
