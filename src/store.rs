//! JSON state files.
//!
//! Monitoring state (history, alert log, cooldowns, trend snapshots) lives in
//! pretty-printed JSON files that are overwritten whole on every save. A
//! missing or unreadable file is never fatal: `load` logs a warning and
//! hands back the caller's default so one bad file cannot stop a run.
//! Before a file that failed to parse can be overwritten, it is copied to
//! `<name>.corrupt`. List files are read entry by entry with [`load_list`],
//! so one bad entry costs only that entry.
//!
//! There is no locking. Runs against the same state directory must not
//! overlap; the last writer wins.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Load a JSON document, falling back to `default` when the file is missing
/// or does not parse.
pub fn load<T: DeserializeOwned>(path: &Path, default: T) -> T {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} does not exist yet, starting empty", path.display());
            return default;
        }
        Err(e) => {
            warn!("Read error on {}: {}; using defaults", path.display(), e);
            return default;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!("Parse error in {}: {}; using defaults", path.display(), e);
            keep_corrupt(path);
            default
        }
    }
}

/// Load a JSON array, skipping entries that do not parse as `T`.
pub fn load_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let entries: Vec<serde_json::Value> = load_or_default(path);
    let total = entries.len();

    let items: Vec<T> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping entry {} of {}: {}", index, path.display(), e);
                None
            }
        })
        .collect();

    if items.len() < total {
        keep_corrupt(path);
    }
    items
}

/// Where the unreadable copy of `path` is kept.
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt");
    PathBuf::from(name)
}

fn keep_corrupt(path: &Path) {
    let backup = corrupt_path(path);
    match fs::copy(path, &backup) {
        Ok(_) => warn!("Kept the unreadable contents in {}", backup.display()),
        Err(e) => warn!("Could not copy {} aside: {}", path.display(), e),
    }
}

/// Load a JSON document, falling back to `T::default()`.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    load(path, T::default())
}

/// Write `value` as 2-space pretty JSON, replacing the file.
pub fn save<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating state directory {}", parent.display()))?;
    }

    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_load_missing_file_returns_default() {
        let value: Vec<u32> = load(Path::new("/nonexistent/path/history.json"), vec![7]);
        assert_eq!(value, vec![7]);
    }

    #[test]
    fn test_load_corrupt_file_returns_default() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let value: BTreeMap<String, i64> = load_or_default(file.path());
        assert!(value.is_empty());
        assert!(corrupt_path(file.path()).exists());
        let _ = fs::remove_file(corrupt_path(file.path()));
    }

    #[test]
    fn test_load_list_skips_bad_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"[1, "two", 3]"#).unwrap();

        let loaded: Vec<u32> = load_list(&path);
        assert_eq!(loaded, vec![1, 3]);

        let kept = fs::read_to_string(corrupt_path(&path)).unwrap();
        assert_eq!(kept, r#"[1, "two", 3]"#);
    }

    #[test]
    fn test_load_list_of_clean_file_keeps_no_copy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        save(&path, &vec![1, 2]).unwrap();

        let loaded: Vec<u32> = load_list(&path);
        assert_eq!(loaded, vec![1, 2]);
        assert!(!corrupt_path(&path).exists());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cooldowns.json");

        let mut value = BTreeMap::new();
        value.insert("threshold:home".to_string(), 1_714_564_800_000_i64);
        save(&path, &value).unwrap();

        let loaded: BTreeMap<String, i64> = load_or_default(&path);
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_save_uses_two_space_indent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        save(&path, &serde_json::json!({ "a": [1] })).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"a\": [\n    1\n  ]\n}\n");
    }

    #[test]
    fn test_save_overwrites_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        save(&path, &vec![1, 2, 3, 4, 5]).unwrap();
        save(&path, &vec![9]).unwrap();

        let loaded: Vec<i32> = load_or_default(&path);
        assert_eq!(loaded, vec![9]);
    }
}
