//! Stub units shared by the operator tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::state::StateBag;
use crate::core::{Unit, Value};

/// Returns a fixed value after an optional delay, counting invocations and
/// recording the state it was invoked with.
pub(crate) struct Probe {
    key: String,
    value: Value,
    delay_ms: u64,
    calls: AtomicUsize,
    finished: AtomicUsize,
    seen: Mutex<Vec<StateBag>>,
}

impl Probe {
    pub(crate) fn new(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
            delay_ms: 0,
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Invocations that ran to completion, delay included.
    pub(crate) fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<StateBag> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Unit for Probe {
    fn key(&self) -> &str {
        &self.key
    }

    async fn invoke(&self, state: &StateBag, _cx: &Context) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(state.clone());
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.clone())
    }
}

/// Always fails, counting invocations.
pub(crate) struct Failing {
    key: String,
    calls: AtomicUsize,
}

impl Failing {
    pub(crate) fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Unit for Failing {
    fn key(&self) -> &str {
        &self.key
    }

    async fn invoke(&self, _state: &StateBag, _cx: &Context) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::failed(format!("{} failed", self.key)))
    }
}
