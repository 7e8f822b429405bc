use async_trait::async_trait;

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::fanout::invoke_all;
use crate::core::state::StateBag;
use crate::core::{ensure_unique_keys, key_or_default, Unit, UnitRef, Value};

/// Fan-out over a fixed set of units, merged by key.
///
/// All units run concurrently against the caller's state. Their results are
/// laid over that state under each unit's key and the merged state goes to
/// the reducer. Without a reducer the merged results are returned as an
/// object. Use [`Fork`](crate::operators::fork::Fork) when the set of units
/// depends on an earlier result.
#[derive(Clone)]
pub struct Parallel {
    units: Vec<UnitRef>,
    reducer: Option<UnitRef>,
    concurrency: Option<usize>,
    key: Option<String>,
}

impl Parallel {
    /// Fails if two units share a key.
    pub fn new(units: Vec<UnitRef>, reducer: UnitRef) -> Result<Self> {
        Self::build(units, Some(reducer))
    }

    /// A parallel step whose result is the object of merged results.
    pub fn collect(units: Vec<UnitRef>) -> Result<Self> {
        Self::build(units, None)
    }

    fn build(units: Vec<UnitRef>, reducer: Option<UnitRef>) -> Result<Self> {
        ensure_unique_keys(&units)?;
        Ok(Self {
            units,
            reducer,
            concurrency: None,
            key: None,
        })
    }

    /// Caps the number of branches in flight, overriding the engine default.
    pub fn with_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        Parallel {
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
impl Unit for Parallel {
    fn key(&self) -> &str {
        key_or_default(&self.key)
    }

    async fn invoke(&self, state: &StateBag, cx: &Context) -> Result<Value> {
        let cx = cx.enter(self.key())?;
        let limit = self.concurrency.unwrap_or(cx.config().max_concurrency);
        let results = invoke_all(&self.units, state, &cx, limit).await?;

        let merged: StateBag = self
            .units
            .iter()
            .map(|unit| unit.key().to_string())
            .zip(results)
            .collect();

        match &self.reducer {
            Some(reducer) => {
                let mut visible = state.clone();
                visible.overlay(merged);
                reducer.invoke(&visible, &cx).await
            }
            None => Ok(merged.into_value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MockBackend};
    use crate::core::error::Error;
    use crate::core::template::Template;
    use crate::operators::eval::Eval;
    use crate::operators::infer::Infer;
    use crate::operators::test_support::{Failing, Probe};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_parallel_merges_by_key() {
        let parallel = Parallel::new(
            vec![
                Arc::new(Eval::new("1").with_key("one")),
                Arc::new(Eval::new("2").with_key("two")),
            ],
            Arc::new(Eval::new(Template::func(["one", "two"], |args| {
                Ok(json!(format!("{}-{}", args.text("one")?, args.text("two")?)))
            }))),
        )
        .unwrap();
        assert_eq!(parallel.run(StateBag::new()).await.unwrap(), json!("1-2"));
    }

    #[tokio::test]
    async fn test_key_association_survives_completion_order() {
        let parallel = Parallel::collect(vec![
            Arc::new(Probe::new("slow", "S").delayed(40)),
            Arc::new(Probe::new("fast", "F")),
        ])
        .unwrap();
        assert_eq!(
            parallel.run(StateBag::new()).await.unwrap(),
            json!({"slow": "S", "fast": "F"})
        );
    }

    #[tokio::test]
    async fn test_reducer_sees_caller_state() {
        let reducer = Arc::new(Probe::new("reducer", "done"));
        let parallel = Parallel::new(
            vec![Arc::new(Eval::new("A").with_key("a"))],
            reducer.clone(),
        )
        .unwrap();
        parallel
            .run(StateBag::new().with("request", "r"))
            .await
            .unwrap();

        let seen = &reducer.seen()[0];
        assert_eq!(seen.get("request"), Some(&json!("r")));
        assert_eq!(seen.get("a"), Some(&json!("A")));
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let parallel = Parallel::collect(
            (0..4)
                .map(|i| Arc::new(Probe::new(&format!("p{}", i), i).delayed(50)) as UnitRef)
                .collect(),
        )
        .unwrap();
        let started = std::time::Instant::now();
        parallel.run(StateBag::new()).await.unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_one_failing_branch_fails_all() {
        let parallel = Parallel::collect(vec![
            Arc::new(Failing::new("bad")),
            Arc::new(Probe::new("good", 1)),
        ])
        .unwrap();
        assert!(matches!(
            parallel.run(StateBag::new()).await,
            Err(Error::Failed(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let result = Parallel::collect(vec![
            Arc::new(Eval::new("1").with_key("x")),
            Arc::new(Eval::new("2").with_key("x")),
        ]);
        assert!(matches!(result, Err(Error::DuplicateKey(key)) if key == "x"));
    }

    #[tokio::test]
    async fn test_reduce_with_inference_template() {
        let backend = Arc::new(MockBackend::echo());
        backend.create_session().await.unwrap();

        let parallel = Parallel::new(
            vec![
                Arc::new(Eval::new("5 + 10").with_key("sum")),
                Arc::new(Eval::new("5 - 10").with_key("diff")),
            ],
            Arc::new(Infer::new(
                backend.clone(),
                Template::func(["sum", "diff"], |args| {
                    Ok(json!(format!("Multiply {} by {}", args.text("sum")?, args.text("diff")?)))
                }),
            )),
        )
        .unwrap();
        assert_eq!(
            parallel.run(StateBag::new()).await.unwrap(),
            json!("Multiply 5 + 10 by 5 - 10")
        );
        assert_eq!(backend.prompts().len(), 1);
    }
}
