const DEFAULT_MAX_DEPTH: usize = 64;
const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Engine-wide limits applied to every invocation made under a [`Context`](crate::core::context::Context).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How deep combinators may nest before an invocation is refused.
    pub max_depth: usize,
    /// How many fan-out branches may be in flight at once.
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        assert!(max_depth > 0, "Max depth must be greater than 0");
        EngineConfig { max_depth, ..self }
    }

    pub fn with_max_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        EngineConfig {
            max_concurrency,
            ..self
        }
    }
}
