use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{BackendRef, Runner, Tool};
use crate::core::context::Context;
use crate::core::error::{Error, ExecutionError, Result};
use crate::core::state::StateBag;
use crate::core::template::Template;
use crate::core::{key_or_default, Unit, Value};

/// A single inference call: renders its template into a prompt and sends it
/// through the backend it was built with.
///
/// The reply is stored as text. When the runner carries an output schema the
/// reply is parsed as JSON instead, so structured results land in the state
/// bag as objects.
#[derive(Clone)]
pub struct Infer {
    template: Template,
    backend: BackendRef,
    runner: Runner,
    key: Option<String>,
}

impl Infer {
    /// An inference unit on the backend's default model, with no tools.
    pub fn new(backend: BackendRef, template: impl Into<Template>) -> Self {
        Self::builder(backend, template).build()
    }

    pub fn builder(backend: BackendRef, template: impl Into<Template>) -> InferBuilder {
        InferBuilder {
            backend,
            template: template.into(),
            model: None,
            tools: Vec::new(),
            output_schema: None,
            key: None,
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Runs the inference call against an explicit state.
    pub(crate) async fn infer(&self, state: &StateBag) -> Result<Value> {
        let prompt = self.template.render_prompt(state)?;
        log::debug!(
            "Unit '{}' calling model '{}' ({} chars)",
            self.key(),
            self.runner.model,
            prompt.len()
        );
        let reply = self.backend.call_agent(&prompt, &self.runner).await?;
        if self.runner.output_schema.is_none() {
            return Ok(Value::String(reply));
        }
        serde_json::from_str::<Value>(&reply).map_err(|e| {
            log::warn!("Unit '{}' got a reply that is not valid JSON: {}", self.key(), e);
            Error::from(ExecutionError::Backend(format!(
                "structured reply is not valid JSON: {}",
                e
            )))
        })
    }
}

#[async_trait]
impl Unit for Infer {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, _cx: &Context) -> Result<Value> {
        self.infer(state).await
    }
}

/// Collects the runner settings of an [`Infer`] unit. The runner is created
/// once, in [`build`](InferBuilder::build).
pub struct InferBuilder {
    backend: BackendRef,
    template: Template,
    model: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    output_schema: Option<Value>,
    key: Option<String>,
}

impl InferBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn tool(mut self, tool: impl Tool) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn build(self) -> Infer {
        let runner =
            self.backend
                .create_runner(self.model.as_deref(), self.tools, self.output_schema);
        Infer {
            template: self.template,
            backend: self.backend,
            runner,
            key: self.key,
        }
    }
}
