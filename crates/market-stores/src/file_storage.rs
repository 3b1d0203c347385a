use crate::{Error, Result, StorageAdapter};
use std::fs;
use std::path::PathBuf;

/// One JSON file per key under `base_path`.
///
/// Keys are percent-encoded into file names, so `list` can hand back the
/// original keys and no key can escape the base directory.
pub struct FileStorageAdapter {
    base_path: PathBuf,
}

impl FileStorageAdapter {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        Ok(Self { base_path })
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl StorageAdapter for FileStorageAdapter {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_to_path(key);

        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("Failed to read file: {}", e))),
        }
    }

    fn put(&self, key: &str, value: String) -> Result<()> {
        let path = self.key_to_path(key);
        let temp_path = path.with_extension("json.tmp");

        fs::write(&temp_path, value)
            .map_err(|e| Error::Storage(format!("Failed to write file: {}", e)))?;
        fs::rename(&temp_path, &path)
            .map_err(|e| Error::Storage(format!("Failed to replace file: {}", e)))?;

        Ok(())
    }

    fn del(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("Failed to delete file: {}", e))),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| Error::Storage(format!("Failed to read directory: {}", e)))?;

        for entry in entries {
            let entry =
                entry.map_err(|e| Error::Storage(format!("Failed to read dir entry: {}", e)))?;

            let file_name = entry.file_name();
            let file_name_str = file_name.to_string_lossy();

            let Some(stem) = file_name_str.strip_suffix(".json") else {
                continue;
            };
            let Ok(key) = urlencoding::decode(stem) else {
                continue;
            };

            if key.starts_with(prefix) {
                keys.push(key.into_owned());
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_adapter_basic() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = FileStorageAdapter::new(temp_dir.path().to_path_buf()).unwrap();

        assert!(adapter.get("test-key").unwrap().is_none());

        adapter.put("test-key", "test-value".to_string()).unwrap();
        assert_eq!(adapter.get("test-key").unwrap(), Some("test-value".to_string()));

        adapter.put("test-key", "replaced".to_string()).unwrap();
        assert_eq!(adapter.get("test-key").unwrap(), Some("replaced".to_string()));

        adapter.del("test-key").unwrap();
        assert!(adapter.get("test-key").unwrap().is_none());
        adapter.del("test-key").unwrap();
    }

    #[test]
    fn test_file_storage_adapter_list_returns_original_keys() {
        let temp_dir = TempDir::new().unwrap();
        let adapter = FileStorageAdapter::new(temp_dir.path().to_path_buf()).unwrap();

        adapter.put("v1/rewards/alice", "{}".to_string()).unwrap();
        adapter.put("v1/rewards/bob%40mail", "{}".to_string()).unwrap();
        adapter.put("v1/conversations/alice", "[]".to_string()).unwrap();

        let mut reward_keys = adapter.list("v1/rewards/").unwrap();
        reward_keys.sort();
        assert_eq!(reward_keys, vec!["v1/rewards/alice", "v1/rewards/bob%40mail"]);

        assert_eq!(adapter.list("").unwrap().len(), 3);
    }

    #[test]
    fn test_keys_cannot_escape_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("store");
        let adapter = FileStorageAdapter::new(base.clone()).unwrap();

        adapter.put("../outside", "x".to_string()).unwrap();

        assert!(!temp_dir.path().join("outside.json").exists());
        assert_eq!(adapter.get("../outside").unwrap(), Some("x".to_string()));
        assert_eq!(adapter.list("").unwrap(), vec!["../outside"]);
    }
}
