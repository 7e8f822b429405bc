//! # funai
//!
//! Functional orchestration of long-latency inference steps.
//!
//! A pipeline is a tree of [`Unit`]s. Each unit reads named results from a
//! [`StateBag`] and produces one value; combinators run their children and
//! store each child's result under the child's key before the next step
//! runs.
//!
//! ## Features
//!
//! - **Explicit state passing**: templates declare the state entries they read
//! - **Control flow**: sequencing, bounded and conditional loops, switch, fallback
//! - **Fan-out**: static [`Parallel`] merge and dynamic [`Fork`] map-reduce, ordered and bounded
//! - **Memoization**: single-slot [`Cache`] and durable [`Store`]
//! - **Pluggable backends**: anything implementing [`Backend`]; an Ollama client behind the `llm` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use funai::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo() -> funai::Result<()> {
//! let backend = Arc::new(MockBackend::echo());
//! backend.create_session().await?;
//!
//! let story = Infer::builder(
//!     backend.clone(),
//!     Template::func(["topic"], |args| {
//!         Ok(json!(format!("Tell a short story about {}", args.text("topic")?)))
//!     }),
//! )
//! .key("story")
//! .build();
//!
//! let pipeline = Sequential::new(
//!     vec![Arc::new(story)],
//!     Arc::new(Infer::new(
//!         backend,
//!         Template::func(["story"], |args| {
//!             Ok(json!(format!("Translate into German: {}", args.text("story")?)))
//!         }),
//!     )),
//! )?;
//!
//! let result = pipeline.run(StateBag::new().with("topic", "a tree")).await?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`core`]: the unit trait, state bag, templates, errors and engine limits
//! - [`operators`]: the units pipelines are composed from
//! - [`backend`]: the inference port, tools and the bundled backends
//! - [`storage`]: persistence used by [`Store`]
//! - [`prelude`]: commonly used types (import with `use funai::prelude::*`)

pub mod backend;
pub mod core;
pub mod operators;
pub mod storage;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use crate::core::config::EngineConfig;
pub use crate::core::context::Context;
pub use crate::core::error::{Error, ExecutionError, Result, SessionError};
pub use crate::core::state::StateBag;
pub use crate::core::template::{Template, TemplateArgs};
pub use crate::core::{Unit, UnitRef, Value, DEFAULT_KEY};

pub use operators::cache::Cache;
pub use operators::catch::{Catch, ERROR_KEY};
pub use operators::eval::Eval;
pub use operators::fork::Fork;
pub use operators::infer::{Infer, InferBuilder};
pub use operators::looping::{Loop, INDEX_KEY};
pub use operators::parallel::Parallel;
pub use operators::sequential::Sequential;
pub use operators::store::Store;
pub use operators::switch::Switch;
pub use operators::transform::Transform;

pub use backend::{
    Backend, BackendRef, CallError, FnTool, ListFiles, MockBackend, ReadFilePage, Runner, Session,
    SessionConfig, Tool, ToolResult, ToolStatus,
};
pub use storage::{FileStorage, MemoryStorage, Storage};

#[cfg(feature = "llm")]
pub use backend::ollama::{OllamaBackend, OllamaConfig};

// ============================================================================
// Prelude
// ============================================================================

/// Imports everything needed to build and run pipelines.
///
/// # Example
/// ```rust
/// use funai::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Backend, BackendRef, Cache, Catch, Context, EngineConfig, Error, Eval, FileStorage, Fork,
        Infer, Loop, MemoryStorage, MockBackend, Parallel, Result, Sequential, SessionConfig,
        StateBag, Storage, Store, Switch, Template, TemplateArgs, Tool, ToolResult, Transform,
        Unit, UnitRef, Value, ERROR_KEY, INDEX_KEY,
    };

    #[cfg(feature = "llm")]
    pub use super::{OllamaBackend, OllamaConfig};
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
