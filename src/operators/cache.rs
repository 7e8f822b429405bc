use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{Unit, UnitRef, Value};

#[derive(Debug, Clone, PartialEq)]
struct CacheEntry {
    fingerprint: u64,
    value: Value,
}

/// Memoizes the result of one wrapped unit.
///
/// The cache holds a single entry keyed by the fingerprint of the whole
/// visible state. A differing fingerprint replaces the entry. [`clear`]
/// drops it so the next invocation recomputes, which is needed when the
/// world changes in a way the state does not show.
///
/// Invocations of the same instance are serialized: a second caller waits
/// for the first and then sees its entry.
///
/// [`clear`]: Cache::clear
pub struct Cache {
    inner: UnitRef,
    key: Option<String>,
    slot: Mutex<Option<CacheEntry>>,
    gate: tokio::sync::Mutex<()>,
}

impl Cache {
    pub fn new(inner: UnitRef) -> Self {
        Self {
            inner,
            key: None,
            slot: Mutex::new(None),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Overrides the key; by default the cache answers to the wrapped unit's key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Drops the stored value and fingerprint.
    pub fn clear(&self) {
        log::debug!("Clearing cache '{}'", self.key());
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_populated(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn lookup(&self, fingerprint: u64) -> Option<Value> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|entry| entry.fingerprint == fingerprint)
            .map(|entry| entry.value.clone())
    }

    fn store(&self, fingerprint: u64, value: Value) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(CacheEntry { fingerprint, value });
    }
}

#[async_trait]
impl Unit for Cache {
    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_else(|| self.inner.key())
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let _turn = self.gate.lock().await;
        let fingerprint = state.fingerprint();

        if let Some(value) = self.lookup(fingerprint) {
            log::debug!("Cache hit for '{}' ({:016x})", self.key(), fingerprint);
            return Ok(value);
        }

        log::debug!("Cache miss for '{}' ({:016x})", self.key(), fingerprint);
        let cx = cx.enter(self.key())?;
        let value = self.inner.invoke(state, &cx).await?;
        self.store(fingerprint, value.clone());
        Ok(value)
    }
}
