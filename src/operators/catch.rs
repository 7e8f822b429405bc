use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{Unit, UnitRef, Value};

/// The state key under which a fallback finds the primary's error message.
///
/// The fallback's view of the state is a copy, so an `error` entry the caller
/// already had is only shadowed for the fallback and is left intact everywhere
/// else.
pub const ERROR_KEY: &str = "error";

/// Runs `primary`; if it fails, runs `fallback` with the same state plus the
/// primary's error message under [`ERROR_KEY`].
///
/// A failing fallback propagates its own error.
#[derive(Clone)]
pub struct Catch {
    primary: UnitRef,
    fallback: UnitRef,
    key: Option<String>,
}

impl Catch {
    pub fn new(primary: UnitRef, fallback: UnitRef) -> Self {
        Self {
            primary,
            fallback,
            key: None,
        }
    }

    /// Overrides the key; by default the primary unit's key is used.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Unit for Catch {
    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_else(|| self.primary.key())
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        match self.primary.invoke(state, &cx).await {
            Ok(value) => Ok(value),
            Err(err) => {
                log::warn!(
                    "Unit '{}' failed ({}), falling back to '{}'",
                    self.primary.key(),
                    err,
                    self.fallback.key()
                );
                let mut state = state.clone();
                if let Some(previous) = state.get(ERROR_KEY) {
                    log::debug!(
                        "Shadowing existing '{}' entry {} for fallback '{}'",
                        ERROR_KEY,
                        previous,
                        self.fallback.key()
                    );
                }
                state.insert(ERROR_KEY, err.to_string());
                self.fallback.invoke(&state, &cx).await
            }
        }
    }
}
