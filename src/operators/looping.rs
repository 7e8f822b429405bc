use std::sync::Arc;

use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{key_or_default, Unit, UnitRef, Value};

/// The state key holding the current iteration index inside a loop body.
pub const INDEX_KEY: &str = "idx";

type Condition = dyn Fn(usize, &StateBag) -> bool + Send + Sync;

/// Repeats `body` while `condition` holds, then runs `finish` on the
/// accumulated state.
///
/// Before each pass the index is stored under [`INDEX_KEY`]; after it, the
/// body's result is stored under the body's key, so the next pass sees the
/// previous result. With zero passes `finish` sees the initial state and
/// the body's key is absent.
///
/// The engine puts no upper bound on the number of passes; the condition
/// has to end the loop.
#[derive(Clone)]
pub struct Loop {
    body: UnitRef,
    condition: Arc<Condition>,
    finish: UnitRef,
    key: Option<String>,
}

impl Loop {
    pub fn new<F>(body: UnitRef, condition: F, finish: UnitRef) -> Self
    where
        F: Fn(usize, &StateBag) -> bool + Send + Sync + 'static,
    {
        Self {
            body,
            condition: Arc::new(condition),
            finish,
            key: None,
        }
    }

    /// Runs `body` exactly `count` times with indices `0..count`.
    pub fn times(body: UnitRef, count: usize, finish: UnitRef) -> Self {
        Self::new(body, move |idx, _| idx < count, finish)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Unit for Loop {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        let mut state = state.clone();
        let mut index = 0usize;

        while (self.condition)(index, &state) {
            state.insert(INDEX_KEY, index);
            let result = self.body.invoke(&state, &cx).await?;
            state.insert(self.body.key(), result);
            index += 1;
        }
        log::debug!("Loop '{}' finished after {} passes", self.key(), index);

        self.finish.invoke(&state, &cx).await
    }
}
