//! Ollama backend for local inference

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::{Backend, CallError, Runner, Session, SessionConfig, ToolResult};
use crate::core::error::{ExecutionError, SessionError};
use crate::core::Value;

/// Configuration for the Ollama backend
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama server URL (default: http://localhost:11434)
    pub host: String,
    /// Default model to use (default: phi4)
    pub default_model: String,
    /// How many tool-call round trips one agent call may take
    pub max_tool_rounds: usize,
    /// System instruction sent ahead of every prompt
    pub system_prompt: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            default_model: "phi4".to_string(),
            max_tool_rounds: 8,
            system_prompt: "You are a helpful assistant".to_string(),
        }
    }
}

impl OllamaConfig {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

/// A message in Ollama's chat format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
}

impl OllamaMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::with_role("tool", content)
    }

    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Request structure for Ollama chat completions
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
}

/// Response from Ollama's chat endpoint
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub message: OllamaMessage,
    pub done: bool,
    #[serde(default)]
    pub done_reason: String,
}

/// Model information from Ollama
#[derive(Debug, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct OllamaModelsResponse {
    pub models: Vec<OllamaModel>,
}

/// Talks to an Ollama server over HTTP.
pub struct OllamaBackend {
    client: reqwest::Client,
    config: OllamaConfig,
    session_config: SessionConfig,
    session: RwLock<Option<Session>>,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            session_config: SessionConfig::default(),
            session: RwLock::new(None),
        }
    }

    pub fn with_session_config(mut self, session_config: SessionConfig) -> Self {
        self.session_config = session_config;
        self
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn has_session(&self) -> bool {
        self.session
            .read()
            .map(|s| s.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }

    /// List available models from Ollama
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.host))
            .send()
            .await?
            .error_for_status()?;
        let res: OllamaModelsResponse = response.json().await?;
        Ok(res.models)
    }

    async fn chat(
        &self,
        runner: &Runner,
        messages: Vec<OllamaMessage>,
    ) -> Result<OllamaChatResponse, ExecutionError> {
        let request = OllamaChatRequest {
            model: runner.model.clone(),
            messages,
            stream: false,
            tools: runner
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name(),
                            "description": tool.description(),
                            "parameters": tool.parameters(),
                        }
                    })
                })
                .collect(),
            format: runner.output_schema.clone(),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutionError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Backend(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExecutionError::Backend(e.to_string()))
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new(OllamaConfig::default())
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn create_session(&self) -> Result<Session, SessionError> {
        let models = self
            .list_models()
            .await
            .map_err(|e| SessionError::Rejected(e.to_string()))?;

        let session = Session::from(&self.session_config);
        log::info!(
            "Ollama session '{}' established at {} ({} models available)",
            session.session_id,
            self.config.host,
            models.len()
        );
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(session)
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn call_agent(&self, prompt: &str, runner: &Runner) -> Result<String, CallError> {
        if !self.has_session() {
            return Err(SessionError::NotEstablished.into());
        }

        let mut messages = vec![
            OllamaMessage::system(self.config.system_prompt.clone()),
            OllamaMessage::user(prompt),
        ];

        for round in 0..=self.config.max_tool_rounds {
            let response = self.chat(runner, messages.clone()).await?;
            let message = response.message;

            if message.tool_calls.is_empty() {
                if message.content.trim().is_empty() {
                    return Err(ExecutionError::NoFinalResponse.into());
                }
                return Ok(message.content);
            }

            log::debug!(
                "Runner {} round {}: {} tool call(s)",
                runner.id,
                round,
                message.tool_calls.len()
            );
            let calls = message.tool_calls.clone();
            messages.push(message);
            for call in calls {
                let result = match runner.tool(&call.function.name) {
                    Some(tool) => tool.call(&call.function.arguments),
                    None => ToolResult::error(format!("Unknown tool '{}'.", call.function.name)),
                };
                if !result.is_success() {
                    log::warn!("Tool '{}' reported: {}", call.function.name, result.output);
                }
                let content = serde_json::to_string(&result)
                    .map_err(|e| ExecutionError::Backend(e.to_string()))?;
                messages.push(OllamaMessage::tool(content));
            }
        }

        Err(ExecutionError::ToolRoundsExceeded(self.config.max_tool_rounds).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_builders() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost:11434");
        assert_eq!(config.default_model, "phi4");

        let custom = OllamaConfig::default()
            .host("http://192.168.1.10:11434")
            .default_model("llama3")
            .max_tool_rounds(2);
        assert_eq!(custom.host, "http://192.168.1.10:11434");
        assert_eq!(custom.default_model, "llama3");
        assert_eq!(custom.max_tool_rounds, 2);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(OllamaMessage::system("s").role, "system");
        assert_eq!(OllamaMessage::user("u").role, "user");
        assert_eq!(OllamaMessage::tool("t").role, "tool");
    }

    #[test]
    fn test_tool_call_response_parses() {
        let raw = json!({
            "model": "phi4",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "list_files", "arguments": {"directory": "/tmp"}}}]
            },
            "done": true
        });
        let response: OllamaChatResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.message.tool_calls.len(), 1);
        assert_eq!(response.message.tool_calls[0].function.name, "list_files");
    }

    #[tokio::test]
    async fn test_call_without_session_fails() {
        let backend = OllamaBackend::default();
        let runner = backend.create_runner(None, Vec::new(), None);
        assert_eq!(runner.model, "phi4");
        let err = backend.call_agent("hi", &runner).await.unwrap_err();
        assert_eq!(err, CallError::Session(SessionError::NotEstablished));
    }
}
