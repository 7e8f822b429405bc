//! Durable homes for unit results, used by [`Store`](crate::operators::store::Store).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::Value;

/// Named value persistence.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn load(&self, name: &str) -> Result<Option<Value>>;
    async fn save(&self, name: &str, value: &Value) -> Result<()>;
}

/// Keeps one JSON document per name inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_name(name)))
    }
}

/// Percent-escapes every byte outside `[A-Za-z0-9_-]`, so distinct names
/// always map to distinct file names and never leave the root directory.
fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, name: &str) -> Result<Option<Value>> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, name: &str, value: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let raw = serde_json::to_string_pretty(value)?;
        tokio::fs::write(self.path_for(name), raw).await?;
        Ok(())
    }
}

/// Process-local storage, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, name: &str) -> Result<Option<Value>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned())
    }

    async fn save(&self, name: &str, value: &Value) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), value.clone());
        Ok(())
    }
}
