use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    /// Milliseconds since the Unix epoch at `set` time.
    pub timestamp: i64,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

pub type CacheMap = BTreeMap<String, CacheEntry>;

/// Outcome of reading the backing file.
#[derive(Debug, Default)]
pub struct Loaded {
    pub entries: CacheMap,
    /// The file existed but did not parse as a cache map.
    pub corrupt: bool,
}

pub fn load(path: &Path) -> io::Result<Loaded> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Loaded::default()),
        Err(err) => return Err(err),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Loaded::default());
    }
    match serde_json::from_slice::<CacheMap>(&bytes) {
        Ok(entries) => Ok(Loaded {
            entries,
            corrupt: false,
        }),
        Err(_) => Ok(Loaded {
            entries: CacheMap::new(),
            corrupt: true,
        }),
    }
}

pub fn save(path: &Path, entries: &CacheMap) -> io::Result<()> {
    let data = serde_json::to_vec_pretty(entries)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
    write_atomic(path, &data)
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", std::process::id()));
    let tmp = std::path::PathBuf::from(tmp);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Drop entries older than `cutoff_ms`, returning how many were removed.
pub fn retain_newer(entries: &mut CacheMap, cutoff_ms: i64) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.timestamp >= cutoff_ms);
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(ts: i64) -> CacheEntry {
        CacheEntry {
            data: json!({"selector": "[data-testid=add-to-cart]"}),
            timestamp: ts,
            request_id: "req-1".to_string(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let loaded = load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.entries.is_empty());
        assert!(!loaded.corrupt);
    }

    #[test]
    fn garbage_is_flagged_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{\"abc\": {\"data\": ").unwrap();
        let loaded = load(&path).unwrap();
        assert!(loaded.corrupt);
        assert!(loaded.entries.is_empty());
    }

    #[test]
    fn entries_use_request_id_field_name() {
        let text = serde_json::to_string(&entry(1)).unwrap();
        assert!(text.contains("\"requestId\":\"req-1\""));
    }

    #[test]
    fn save_then_load_preserves_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let mut map = CacheMap::new();
        map.insert("k1".to_string(), entry(10));
        save(&path, &map).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.entries, map);
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn retain_newer_counts_removed() {
        let mut map = CacheMap::new();
        map.insert("old".to_string(), entry(5));
        map.insert("new".to_string(), entry(50));
        assert_eq!(retain_newer(&mut map, 10), 1);
        assert!(map.contains_key("new"));
    }
}
