use std::sync::Arc;

use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{key_or_default, Unit, UnitRef, Value};

type Condition = dyn Fn(&StateBag) -> bool + Send + Sync;

/// Picks one of two units based on the current state.
#[derive(Clone)]
pub struct Switch {
    if_branch: UnitRef,
    else_branch: UnitRef,
    condition: Arc<Condition>,
    key: Option<String>,
}

impl Switch {
    pub fn new<F>(if_branch: UnitRef, else_branch: UnitRef, condition: F) -> Self
    where
        F: Fn(&StateBag) -> bool + Send + Sync + 'static,
    {
        Self {
            if_branch,
            else_branch,
            condition: Arc::new(condition),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Unit for Switch {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        if (self.condition)(state) {
            self.if_branch.invoke(state, &cx).await
        } else {
            self.else_branch.invoke(state, &cx).await
        }
    }
}
