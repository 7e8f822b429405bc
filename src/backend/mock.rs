//! A scripted backend for tests and offline demos.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::backend::{Backend, CallError, Runner, Session, SessionConfig};
use crate::core::error::{ExecutionError, SessionError};

type Responder = dyn Fn(&str, &Runner) -> Result<String, ExecutionError> + Send + Sync;

/// Answers prompts with a closure while enforcing the session lifecycle of a
/// real provider. Every prompt it receives is recorded.
pub struct MockBackend {
    config: SessionConfig,
    responder: Arc<Responder>,
    reject_with: Option<String>,
    session: RwLock<Option<Session>>,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &Runner) -> Result<String, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            config: SessionConfig::default(),
            responder: Arc::new(responder),
            reject_with: None,
            session: RwLock::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the prompt itself.
    pub fn echo() -> Self {
        Self::new(|prompt, _| Ok(prompt.to_string()))
    }

    /// A backend whose session creation always fails with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        let mut backend = Self::echo();
        backend.reject_with = Some(reason.into());
        backend
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn create_session(&self) -> Result<Session, SessionError> {
        if let Some(reason) = &self.reject_with {
            return Err(SessionError::Rejected(reason.clone()));
        }
        let mut slot = self.session.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.as_ref() {
            return Ok(existing.clone());
        }
        let session = Session::from(&self.config);
        log::info!(
            "Mock session '{}' established for app '{}'",
            session.session_id,
            session.app_name
        );
        *slot = Some(session.clone());
        Ok(session)
    }

    fn default_model(&self) -> &str {
        "mock"
    }

    async fn call_agent(&self, prompt: &str, runner: &Runner) -> Result<String, CallError> {
        if self.session().is_none() {
            return Err(SessionError::NotEstablished.into());
        }
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        Ok((self.responder)(prompt, runner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_before_session_fails() {
        let backend = MockBackend::echo();
        let runner = backend.create_runner(None, Vec::new(), None);
        let err = backend.call_agent("hi", &runner).await.unwrap_err();
        assert_eq!(err, CallError::Session(SessionError::NotEstablished));
    }

    #[tokio::test]
    async fn test_session_is_created_once() {
        let backend = MockBackend::echo();
        let first = backend.create_session().await.unwrap();
        let second = backend.create_session().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.app_name, "fun_ai");
    }

    #[tokio::test]
    async fn test_rejected_session() {
        let backend = MockBackend::rejecting("bad credentials");
        let err = backend.create_session().await.unwrap_err();
        assert_eq!(err, SessionError::Rejected("bad credentials".to_string()));
    }

    #[tokio::test]
    async fn test_records_prompts() {
        let backend = MockBackend::new(|prompt, runner| Ok(format!("{}:{}", runner.model, prompt)));
        backend.create_session().await.unwrap();
        let runner = backend.create_runner(Some("tiny"), Vec::new(), None);
        let reply = backend.call_agent("hello", &runner).await.unwrap();
        assert_eq!(reply, "tiny:hello");
        assert_eq!(backend.prompts(), vec!["hello".to_string()]);
    }
}
