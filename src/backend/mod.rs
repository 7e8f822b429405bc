//! The port every inference-performing unit calls through.
//!
//! A [`Backend`] owns the session lifecycle and executes prompts. Units get
//! their backend handed to them at construction time; nothing is resolved
//! through a global at call time.

pub mod mock;
#[cfg(feature = "llm")]
pub mod ollama;
pub mod tool;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{ExecutionError, SessionError};
use crate::core::Value;

pub use mock::MockBackend;
pub use tool::{FnTool, ListFiles, ReadFilePage, Tool, ToolResult, ToolStatus};

/// Shared handle to a backend.
pub type BackendRef = Arc<dyn Backend>;

/// Identity used when establishing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: "fun_ai".to_string(),
            user_id: "local".to_string(),
            session_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl SessionConfig {
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// An established, process-wide execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl From<&SessionConfig> for Session {
    fn from(config: &SessionConfig) -> Self {
        Session {
            app_name: config.app_name.clone(),
            user_id: config.user_id.clone(),
            session_id: config.session_id.clone(),
        }
    }
}

/// An execution handle bound to a model, its tools and an optional output schema.
#[derive(Clone)]
pub struct Runner {
    pub id: String,
    pub model: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub output_schema: Option<Value>,
}

impl Runner {
    pub fn new(model: impl Into<String>, tools: Vec<Arc<dyn Tool>>, output_schema: Option<Value>) -> Self {
        Runner {
            id: format!("runner_{}", uuid::Uuid::new_v4().simple()),
            model: model.into(),
            tools,
            output_schema,
        }
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("output_schema", &self.output_schema)
            .finish()
    }
}

/// The provider contract consumed by inference units.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Establishes the process-wide session. Must succeed once before any
    /// call to [`call_agent`](Backend::call_agent).
    async fn create_session(&self) -> Result<Session, SessionError>;

    /// The model used when a unit does not name one.
    fn default_model(&self) -> &str;

    /// Binds a model, tools and an optional structured-output schema into a runner.
    fn create_runner(
        &self,
        model: Option<&str>,
        tools: Vec<Arc<dyn Tool>>,
        output_schema: Option<Value>,
    ) -> Runner {
        Runner::new(model.unwrap_or(self.default_model()), tools, output_schema)
    }

    /// Sends `prompt` through `runner` and returns the final text.
    async fn call_agent(&self, prompt: &str, runner: &Runner) -> Result<String, CallError>;
}

/// What a single agent call can fail with.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CallError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<CallError> for crate::core::error::Error {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Session(e) => e.into(),
            CallError::Execution(e) => e.into(),
        }
    }
}
