use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::{Error, Result};
use crate::core::state::StateBag;
use crate::core::{ensure_unique_keys, key_or_default, Unit, UnitRef, Value};

/// Runs its units one after the other, each seeing the results of all the
/// ones before it, then hands the accumulated state to `finish`.
///
/// `finish` is usually an [`Infer`](crate::operators::infer::Infer) for a
/// final inference call, or an [`Eval`](crate::operators::eval::Eval) for a
/// local reduction.
#[derive(Clone)]
pub struct Sequential {
    units: Vec<UnitRef>,
    finish: UnitRef,
    key: Option<String>,
}

impl Sequential {
    /// Fails if `units` is empty or two of them share a key.
    pub fn new(units: Vec<UnitRef>, finish: UnitRef) -> Result<Self> {
        if units.is_empty() {
            return Err(Error::EmptyComposition("Sequential"));
        }
        ensure_unique_keys(&units)?;
        Ok(Self {
            units,
            finish,
            key: None,
        })
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Unit for Sequential {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        let mut state = state.clone();

        for unit in &self.units {
            let result = unit.invoke(&state, &cx).await?;
            state.insert(unit.key(), result);
        }

        self.finish.invoke(&state, &cx).await
    }
}
