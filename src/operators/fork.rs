use std::sync::Arc;

use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::fanout::invoke_all;
use crate::core::state::StateBag;
use crate::core::{key_or_default, Unit, UnitRef, Value};

type Mapper = dyn Fn(&Value) -> Result<Vec<UnitRef>> + Send + Sync;
type Reducer = dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync;

/// Dynamic map-reduce.
///
/// Runs `seed` once, asks `mapper` for a list of units built from the seed's
/// result, runs all of them concurrently against the caller's state and
/// reduces their results. The reducer receives the results in the order the
/// mapper produced the units. If any mapped unit fails, the whole fork fails
/// once every branch has finished.
#[derive(Clone)]
pub struct Fork {
    seed: UnitRef,
    mapper: Arc<Mapper>,
    reducer: Arc<Reducer>,
    concurrency: Option<usize>,
    key: Option<String>,
}

impl Fork {
    pub fn new<M, R>(seed: UnitRef, mapper: M, reducer: R) -> Self
    where
        M: Fn(&Value) -> Result<Vec<UnitRef>> + Send + Sync + 'static,
        R: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            seed,
            mapper: Arc::new(mapper),
            reducer: Arc::new(reducer),
            concurrency: None,
            key: None,
        }
    }

    /// Caps the number of branches in flight, overriding the engine default.
    pub fn with_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        Fork {
            concurrency: Some(max_concurrency),
            ..self
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Unit for Fork {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        let seed = self.seed.invoke(state, &cx).await?;

        let branches = (self.mapper)(&seed)?;
        log::debug!("Fork '{}' mapped seed into {} branches", self.key(), branches.len());

        let limit = self.concurrency.unwrap_or(cx.config().max_concurrency);
        let results = invoke_all(&branches, state, &cx, limit).await?;
        (self.reducer)(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::operators::eval::Eval;
    use crate::operators::test_support::{Failing, Probe};
    use serde_json::json;

    fn join_with(sep: &'static str) -> impl Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static {
        move |results| {
            let parts: Vec<String> = results
                .into_iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect();
            Ok(json!(parts.join(sep)))
        }
    }

    #[tokio::test]
    async fn test_fork_maps_and_reduces() {
        let fork = Fork::new(
            Arc::new(Eval::new("a,b")),
            |seed| {
                Ok(seed
                    .as_str()
                    .unwrap_or_default()
                    .split(',')
                    .map(|x| Arc::new(Eval::new(format!("{}!", x))) as UnitRef)
                    .collect())
            },
            join_with("|"),
        );
        assert_eq!(fork.run(StateBag::new()).await.unwrap(), json!("a!|b!"));
    }

    #[tokio::test]
    async fn test_fork_keeps_mapper_order_when_completion_is_reversed() {
        let fork = Fork::new(
            Arc::new(Eval::new(json!(["first", "second", "third"]))),
            |seed| {
                let items = seed.as_array().cloned().unwrap_or_default();
                let count = items.len() as u64;
                Ok(items
                    .into_iter()
                    .enumerate()
                    // earlier branches sleep longer, so they finish last
                    .map(|(i, item)| {
                        Arc::new(Probe::new("branch", item).delayed((count - i as u64) * 30)) as UnitRef
                    })
                    .collect())
            },
            join_with(","),
        );
        assert_eq!(
            fork.run(StateBag::new()).await.unwrap(),
            json!("first,second,third")
        );
    }

    #[tokio::test]
    async fn test_fork_branches_see_caller_state() {
        let probe = Arc::new(Probe::new("branch", "x"));
        let mapped = probe.clone();
        let fork = Fork::new(
            Arc::new(Eval::new("seed")),
            move |_| Ok(vec![mapped.clone() as UnitRef]),
            |results| Ok(json!(results.len())),
        );
        let result = fork.run(StateBag::new().with("request", "r")).await.unwrap();
        assert_eq!(result, json!(1));
        assert_eq!(probe.seen()[0].get("request"), Some(&json!("r")));
    }

    #[tokio::test]
    async fn test_fork_fails_after_all_branches_complete() {
        let slow = Arc::new(Probe::new("slow", "late").delayed(30));
        let failing = Arc::new(Failing::new("bad"));
        let (s, f) = (slow.clone(), failing.clone());
        let fork = Fork::new(
            Arc::new(Eval::new("seed")),
            move |_| Ok(vec![f.clone() as UnitRef, s.clone() as UnitRef]),
            |_| Ok(json!("unreachable")),
        );

        let err = fork.run(StateBag::new()).await.unwrap_err();
        assert!(matches!(err, Error::Failed(_)));
        assert_eq!(failing.calls(), 1);
        assert_eq!(slow.finished(), 1);
    }

    #[tokio::test]
    async fn test_fork_with_empty_mapping() {
        let fork = Fork::new(
            Arc::new(Eval::new("")),
            |_| Ok(Vec::new()),
            |results| Ok(json!(results.len())),
        )
        .with_concurrency(2);
        assert_eq!(fork.run(StateBag::new()).await.unwrap(), json!(0));
    }
}
