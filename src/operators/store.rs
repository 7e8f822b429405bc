use std::sync::Arc;

use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{Unit, UnitRef, Value};
use crate::storage::Storage;

/// Makes a unit's result durable under `name`.
///
/// If storage already holds a value for `name` it is returned without
/// invoking the wrapped unit; otherwise the unit runs and its result is saved.
#[derive(Clone)]
pub struct Store {
    inner: UnitRef,
    storage: Arc<dyn Storage>,
    name: String,
    key: Option<String>,
}

impl Store {
    pub fn new(inner: UnitRef, storage: Arc<dyn Storage>, name: impl Into<String>) -> Self {
        Self {
            inner,
            storage,
            name: name.into(),
            key: None,
        }
    }

    /// Overrides the key; by default the wrapped unit's key is used.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Unit for Store {
    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_else(|| self.inner.key())
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        if let Some(value) = self.storage.load(&self.name).await? {
            log::debug!("Loaded '{}' from storage", self.name);
            return Ok(value);
        }

        let cx = cx.enter(self.key())?;
        let value = self.inner.invoke(state, &cx).await?;
        self.storage.save(&self.name, &value).await?;
        log::debug!("Saved '{}' to storage", self.name);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_support::{Failing, Probe};
    use crate::storage::{FileStorage, MemoryStorage};
    use serde_json::json;

    #[tokio::test]
    async fn test_store_invokes_once_then_loads() {
        let storage = Arc::new(MemoryStorage::new());
        let probe = Arc::new(Probe::new("profile", "learner profile"));
        let store = Store::new(probe.clone(), storage.clone(), "profile");

        assert_eq!(store.run(StateBag::new()).await.unwrap(), json!("learner profile"));
        assert_eq!(store.run(StateBag::new()).await.unwrap(), json!("learner profile"));
        assert_eq!(probe.calls(), 1);
        assert_eq!(storage.load("profile").await.unwrap(), Some(json!("learner profile")));
    }

    #[tokio::test]
    async fn test_store_survives_new_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(Probe::new("story", "v1"));
        Store::new(first.clone(), Arc::new(FileStorage::new(dir.path())), "story")
            .run(StateBag::new())
            .await
            .unwrap();

        let second = Arc::new(Probe::new("story", "v2"));
        let result = Store::new(second.clone(), Arc::new(FileStorage::new(dir.path())), "story")
            .run(StateBag::new())
            .await
            .unwrap();
        assert_eq!(result, json!("v1"));
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_saves_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let store = Store::new(Arc::new(Failing::new("bad")), storage.clone(), "bad");
        assert!(store.run(StateBag::new()).await.is_err());
        assert_eq!(storage.load("bad").await.unwrap(), None);
    }
}
