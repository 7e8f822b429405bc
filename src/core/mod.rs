pub mod config;
pub mod context;
pub mod error;
pub mod fanout;
pub mod state;
pub mod template;

use std::sync::Arc;

use async_trait::async_trait;

use context::Context;
use error::Result;
use state::StateBag;

/// The Alias for serde_json::Value, every result in the state bag is one.
pub type Value = serde_json::Value;

/// The key a unit answers to when none was assigned.
pub const DEFAULT_KEY: &str = "it";

/// Shared handle to a unit. Units are built once and invoked many times,
/// possibly from several places in the same pipeline.
pub type UnitRef = Arc<dyn Unit>;

/// A named, callable piece of orchestrated work.
///
/// A unit reads what it needs from the state bag and produces one value.
/// Combinators are units themselves, so a pipeline is a tree of units with
/// a single root.
#[async_trait]
pub trait Unit: Send + Sync + 'static {
    /// The name the unit's result is stored under in the state bag.
    fn key(&self) -> &str;

    /// Runs the unit against `state`.
    ///
    /// `cx` tracks nesting depth and concurrency limits; combinators pass a
    /// child context (see [`Context::enter`]) to the units they own.
    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value>;

    /// Invokes the unit as the root of a pipeline with the default engine
    /// configuration.
    async fn run(&self, state: StateBag) -> Result<Value> {
        self.invoke(&state, &Context::default()).await
    }
}

/// Resolves an optional assigned key to the effective one.
pub(crate) fn key_or_default(key: &Option<String>) -> &str {
    key.as_deref().unwrap_or(DEFAULT_KEY)
}

/// Fails with [`error::Error::DuplicateKey`] when two siblings share a key.
pub(crate) fn ensure_unique_keys(units: &[UnitRef]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for unit in units {
        if !seen.insert(unit.key()) {
            return Err(error::Error::DuplicateKey(unit.key().to_string()));
        }
    }
    Ok(())
}
