use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::template::Template;
use crate::core::{key_or_default, Unit, Value};

/// Evaluates a template locally, without calling a backend.
///
/// Static templates return their value as is; callable templates run over
/// the state entries they declare. Used for stubs, reducers and final steps
/// that only reshape earlier results.
#[derive(Debug, Clone)]
pub struct Eval {
    template: Template,
    key: Option<String>,
}

impl Eval {
    pub fn new(template: impl Into<Template>) -> Self {
        Self {
            template: template.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

#[async_trait]
impl Unit for Eval {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, _cx: &Context) -> Result<Value> {
        self.template.render(state)
    }
}
