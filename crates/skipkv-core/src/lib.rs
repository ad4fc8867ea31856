//! SkipKV Core: sorted in-memory key-value index with text snapshots
//!
//! An ordered index of string keys to dynamic values, backed by a skip list,
//! plus an explicit dump/load pair that persists the whole index as a
//! line-oriented text file.
//!
//! # Architecture
//!
//! - **Index**: arena-backed skip list behind a single `RwLock`
//! - **Values**: closed sum type with a canonical, byte-stable text encoding
//! - **Snapshots**: `key:encoded-value` per line, walked in key order
//!
//! Durability is best effort: nothing reaches disk until a dump is requested.

pub mod config;
pub mod error;
pub mod level;
pub mod platform_durability;
pub mod skiplist;
pub mod snapshot;
pub mod store;
pub mod value;

// Re-export key types for convenience
pub use config::Config;
pub use error::{KvError, KvResult};
pub use skiplist::SkipList;
pub use snapshot::{dump_file, load_file, SnapshotStats, SnapshotValue};
pub use store::Store;
pub use value::{Number, ParseError, ParsedValues, Value, ValueKind};
