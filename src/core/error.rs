use thiserror::Error;

/// Failures of the backend session lifecycle. Fatal for the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Backend session has not been established")]
    NotEstablished,

    #[error("Backend rejected the session: {0}")]
    Rejected(String),
}

/// A single inference call that produced no usable result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("No final response received from the agent")]
    NoFinalResponse,

    #[error("Agent escalated: {0}")]
    Escalated(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Agent exceeded {0} tool rounds without a final response")]
    ToolRoundsExceeded(usize),
}

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Template parameter '{0}' is missing from the state")]
    MissingParameter(String),

    #[error("Duplicate unit key '{0}' among siblings")]
    DuplicateKey(String),

    #[error("{0} requires at least one unit")]
    EmptyComposition(&'static str),

    #[error("Nesting depth exceeded the configured limit of {0}")]
    DepthExceeded(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

impl Error {
    /// Shorthand for user-level failures raised from templates and reducers.
    pub fn failed(msg: impl Into<String>) -> Self {
        Error::Failed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
