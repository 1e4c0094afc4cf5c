use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Collection, StorageError};

/// Flat-document backend: the whole collection is one JSON object on disk,
/// keyed the same way as the collection.
///
/// The document is held in memory behind a mutex and rewritten on every
/// write (temp file, fsync, rename). The in-memory copy only changes once
/// the new document is durably on disk.
pub struct DocumentCollection {
    name: String,
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl DocumentCollection {
    /// Opens `<dir>/<name>.json`, creating the directory and an empty
    /// document if they do not exist yet.
    pub async fn open(dir: &Path, name: &str) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{name}.json"));

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::write(&path, b"{}").await?;
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened document collection '{}' at {} ({} entries)",
            name,
            path.display(),
            entries.len()
        );

        Ok(Self {
            name: name.to_string(),
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        sync_parent_dir(&self.path).await?;
        debug!("Flushed {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

/// Makes a completed rename durable by syncing the directory entry.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await?;
    Ok(())
}

// Directories cannot be opened as files here; rename is as durable as it gets.
#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[async_trait]
impl Collection for DocumentCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next).await?;
        *entries = next;
        Ok(true)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError> {
        Ok(self
            .entries
            .lock()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
