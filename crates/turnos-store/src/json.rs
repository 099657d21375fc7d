//! Whole-file JSON reads and crash-safe writes.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::StoreError;

/// Read and parse a JSON file. A missing file is `Ok(None)`; a file that
/// exists but does not parse is [`StoreError::Corrupt`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialize `value` as indented UTF-8 JSON and replace `path` atomically.
///
/// The content goes to a temporary file in the target directory first and is
/// renamed over `path` only once fully written, so readers see either the old
/// file or the new one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(&body).map_err(|e| StoreError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Move a corrupt file aside as `<name>.corrupt-<timestamp>` so it is kept
/// for inspection before a fresh file replaces it.
pub fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".corrupt-{stamp}"));
    let target = path.with_file_name(name);
    std::fs::rename(path, &target).map_err(|e| StoreError::io(path, e))?;
    warn!(from = %path.display(), to = %target.display(), "moved corrupt file aside");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_reads_as_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let got: Option<BTreeMap<String, u32>> = read_json(&tmp.path().join("nope.json")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn unparsable_file_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json::<BTreeMap<String, u32>>(&path).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn atomic_write_creates_parents_and_keeps_utf8() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data").join("out.json");
        let mut value = BTreeMap::new();
        value.insert("Zárate".to_string(), 1u32);

        write_json_atomic(&path, &value).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Zárate"));
        assert!(text.ends_with('\n'));
        let back: Option<BTreeMap<String, u32>> = read_json(&path).unwrap();
        assert_eq!(back.unwrap(), value);
        // No temp files left behind.
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn quarantine_moves_file_aside() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        std::fs::write(&path, "garbage").unwrap();

        let moved = quarantine(&path).unwrap();

        assert!(!path.exists());
        assert!(moved.exists());
        let name = moved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("cache.json.corrupt-"));
    }
}
