use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};

/// Per-invocation bookkeeping handed down the unit tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    config: EngineConfig,
    depth: usize,
}

impl Context {
    /// A root context using `config`.
    pub fn new(config: EngineConfig) -> Self {
        Context { config, depth: 0 }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The context for the children of the combinator named `key`.
    pub fn enter(&self, key: &str) -> Result<Context> {
        let depth = self.depth + 1;
        if depth > self.config.max_depth {
            log::error!(
                "Refusing to enter '{}': depth {} exceeds limit {}",
                key,
                depth,
                self.config.max_depth
            );
            return Err(Error::DepthExceeded(self.config.max_depth));
        }
        log::debug!("Entering '{}' at depth {}", key, depth);
        Ok(Context {
            config: self.config,
            depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_increments_depth() {
        let root = Context::default();
        let child = root.enter("child").unwrap();
        assert_eq!(root.depth(), 0);
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn test_enter_past_limit_fails() {
        let root = Context::new(EngineConfig::new().with_max_depth(1));
        let child = root.enter("a").unwrap();
        assert!(matches!(child.enter("b"), Err(Error::DepthExceeded(1))));
    }
}
