use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{key_or_default, Unit, UnitRef, Value};
use crate::operators::infer::Infer;

/// Runs `source`, then an inference call that can read the source's result
/// under the source's key.
#[derive(Clone)]
pub struct Transform {
    source: UnitRef,
    infer: Infer,
    key: Option<String>,
}

impl Transform {
    pub fn new(source: UnitRef, infer: Infer) -> Self {
        Self {
            source,
            infer,
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Unit for Transform {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        let source = self.source.invoke(state, &cx).await?;

        let mut state = state.clone();
        state.insert(self.source.key(), source);
        self.infer.infer(&state).await
    }
}
