//! Text snapshots of a `SkipList`.
//!
//! One record per line, in ascending key order:
//!
//! ```text
//! <key>:<encoded value>\n
//! ```
//!
//! The line is split once, at the first `:`, so encoded values may contain
//! colons (inside strings). Keys may not: a key that is empty or contains
//! `:` or a newline is left out of the dump.
//!
//! A load goes through the index's normal insert path, record by record; it
//! is not an atomic bulk replace. Lines that are empty, lack the delimiter,
//! are not UTF-8, or hold a value that does not decode are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{KvError, KvResult};
use crate::platform_durability::durable_sync;
use crate::skiplist::SkipList;
use crate::value::{ParseError, Value};

/// Separates the key from the encoded value on each line
pub const DELIMITER: char = ':';

/// Values that can be written to and read back from a snapshot line.
pub trait SnapshotValue: Sized {
    fn encode_into(&self, out: &mut String);
    fn decode(text: &str) -> Result<Self, ParseError>;
}

impl SnapshotValue for Value {
    fn encode_into(&self, out: &mut String) {
        Value::encode_into(self, out)
    }

    fn decode(text: &str) -> Result<Self, ParseError> {
        Value::parse(text)
    }
}

/// Outcome of a dump or load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Records written, or inserted into the index
    pub entries: usize,
    /// Keys left out of a dump, or lines rejected by a load
    pub skipped: usize,
    /// Snapshot size in bytes
    pub bytes: u64,
    /// CRC32C over the snapshot bytes; equal for a dump and the load of it
    pub checksum: u32,
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(DELIMITER) && !key.contains('\n')
}

/// Write every entry of `list` to `path`, replacing the file.
///
/// The read lock is held from the first record until the file is flushed
/// (and synced, with `sync`), so the snapshot is a consistent cut.
pub fn dump_file<K, V, P>(list: &SkipList<K, V>, path: P, sync: bool) -> KvResult<SnapshotStats>
where
    K: Ord + AsRef<str>,
    V: SnapshotValue,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let inner = list.read();

    let file = File::create(path).map_err(|e| KvError::io_at(path, "Failed to create snapshot", e))?;
    let mut writer = BufWriter::new(file);
    let mut stats = SnapshotStats::default();
    let mut line = String::new();

    for (key, value) in inner.iter() {
        let key = key.as_ref();
        if !is_valid_key(key) {
            log::warn!("[SNAPSHOT] Key {:?} cannot be represented, leaving it out", key);
            stats.skipped += 1;
            continue;
        }

        line.clear();
        line.push_str(key);
        line.push(DELIMITER);
        value.encode_into(&mut line);
        line.push('\n');

        writer
            .write_all(line.as_bytes())
            .map_err(|e| KvError::io_at(path, "Snapshot write failed", e))?;
        stats.checksum = crc32c::crc32c_append(stats.checksum, line.as_bytes());
        stats.bytes += line.len() as u64;
        stats.entries += 1;
    }

    writer.flush().map_err(|e| KvError::io_at(path, "Snapshot flush failed", e))?;
    if sync {
        durable_sync(writer.get_ref()).map_err(|e| KvError::io_at(path, "Snapshot durable_sync failed", e))?;
    }
    drop(writer);
    drop(inner);

    log::debug!(
        "[SNAPSHOT] Dumped {} entries ({} bytes, {} skipped) to {}",
        stats.entries,
        stats.bytes,
        stats.skipped,
        path.display()
    );
    Ok(stats)
}

/// Insert every valid record of the snapshot at `path` into `list`.
///
/// If the file cannot be opened the index is not touched and no lock is
/// taken. Otherwise the write lock is held for the whole load.
pub fn load_file<K, V, P>(list: &SkipList<K, V>, path: P) -> KvResult<SnapshotStats>
where
    K: Ord + From<String>,
    V: SnapshotValue,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| KvError::io_at(path, "Failed to open snapshot", e))?;
    let mut reader = BufReader::new(file);
    let mut stats = SnapshotStats::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    let mut inner = list.write();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| KvError::io_at(path, "Snapshot read failed", e))?;
        if n == 0 {
            break;
        }
        line_no += 1;
        stats.checksum = crc32c::crc32c_append(stats.checksum, &buf);
        stats.bytes += n as u64;

        let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
        match parse_line::<V>(line) {
            Ok((key, value)) => {
                inner.insert(K::from(key.to_owned()), value);
                stats.entries += 1;
            }
            Err(reason) => {
                log::warn!("[SNAPSHOT] {}:{}: skipping line: {}", path.display(), line_no, reason);
                stats.skipped += 1;
            }
        }
    }
    drop(inner);

    log::debug!(
        "[SNAPSHOT] Loaded {} entries ({} lines skipped) from {}",
        stats.entries,
        stats.skipped,
        path.display()
    );
    Ok(stats)
}

/// Split a record into its key and decoded value.
fn parse_line<V: SnapshotValue>(line: &[u8]) -> Result<(&str, V), String> {
    if line.is_empty() {
        return Err("empty line".into());
    }
    let line = std::str::from_utf8(line).map_err(|e| format!("not UTF-8: {}", e))?;
    let (key, raw) = line
        .split_once(DELIMITER)
        .ok_or_else(|| format!("no '{}' delimiter", DELIMITER))?;
    if key.is_empty() {
        return Err("empty key".into());
    }
    let value = V::decode(raw).map_err(|e| format!("bad value: {}", e))?;
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;
    use test_log::test;

    fn index() -> SkipList<String, Value> {
        SkipList::with_config(&Config::deterministic(17)).unwrap()
    }

    #[test]
    fn test_dump_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");

        let list = index();
        list.insert("y".into(), Value::from("2"));
        list.insert("x".into(), Value::from("1"));
        list.insert("n".into(), Value::from(7));
        let stats = dump_file(&list, &path, false).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "n:7\nx:\"1\"\ny:\"2\"\n");
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.bytes, text.len() as u64);
        assert_eq!(stats.checksum, crc32c::crc32c(text.as_bytes()));
    }

    #[test]
    fn test_dump_truncates_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");
        std::fs::write(&path, "stale:1\nstale:2\nstale:3\n").unwrap();

        let list = index();
        list.insert("fresh".into(), Value::Null);
        dump_file(&list, &path, true).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh:null\n");
    }

    #[test]
    fn test_dump_skips_unrepresentable_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");

        let list = index();
        list.insert("".into(), Value::from(1));
        list.insert("a:b".into(), Value::from(2));
        list.insert("line\nbreak".into(), Value::from(3));
        list.insert("ok".into(), Value::from(4));
        let stats = dump_file(&list, &path, false).unwrap();

        assert_eq!(stats.entries, 1);
        assert_eq!(stats.skipped, 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ok:4\n");
    }

    #[test]
    fn test_load_skips_malformed_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");
        std::fs::write(
            &path,
            "good:1\n\nno delimiter here\n:novalue\nbad:{\"a\".\nurl:\"http://x:80\"\nlast:true",
        )
        .unwrap();

        let list = index();
        let stats = load_file(&list, &path).unwrap();

        assert_eq!(stats.entries, 3);
        assert_eq!(stats.skipped, 4);
        assert_eq!(list.find("good"), Some(Value::from(1)));
        assert_eq!(list.find("url"), Some(Value::from("http://x:80")));
        assert_eq!(list.find("last"), Some(Value::from(true)));
        assert_eq!(list.find("bad"), None);
    }

    #[test]
    fn test_load_skips_invalid_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");
        std::fs::write(&path, b"a:1\n\xff\xfe:2\nb:2\n").unwrap();

        let list = index();
        let stats = load_file(&list, &path).unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_load_missing_file_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let list = index();
        list.insert("keep".into(), Value::from(1));

        let result = load_file(&list, tmp.path().join("absent"));
        assert!(matches!(result, Err(KvError::Io { kind: std::io::ErrorKind::NotFound, .. })));
        assert_eq!(list.size(), 1);

        // Lock was never taken, so writers still get through
        assert!(list.insert("after".into(), Value::from(2)));
    }

    #[test]
    fn test_load_duplicates_behave_like_inserts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");
        std::fs::write(&path, "k:\"v1\"\nk:\"v2\"\n").unwrap();

        let list = index();
        load_file(&list, &path).unwrap();
        assert_eq!(list.size(), 2);
        assert_eq!(list.find("k"), Some(Value::from("v1")));
    }

    #[test]
    fn test_roundtrip_checksums_match() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data_file");

        let list = index();
        for i in 0..200 {
            list.insert(format!("key{:03}", i), Value::from(i as f64 / 7.0));
        }
        let dumped = dump_file(&list, &path, false).unwrap();

        let restored = index();
        let loaded = load_file(&restored, &path).unwrap();

        assert_eq!(loaded.entries, dumped.entries);
        assert_eq!(loaded.bytes, dumped.bytes);
        assert_eq!(loaded.checksum, dumped.checksum);
        assert_eq!(restored.entries(), list.entries());
    }

    #[test]
    fn test_dump_to_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let list = index();
        list.insert("a".into(), Value::Null);

        let result = dump_file(&list, tmp.path().join("no/such/dir/data_file"), false);
        assert!(matches!(result, Err(KvError::Io { path: Some(_), .. })));
        // Read lock released on the error path
        assert!(list.insert("b".into(), Value::Null));
    }
}
