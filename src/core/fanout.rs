use futures::stream::{self, StreamExt};

use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::state::StateBag;
use crate::core::{UnitRef, Value};

/// Invokes every unit concurrently against the same read-only `state`.
///
/// At most `limit` branches are in flight at once. Results come back in the
/// order of `units`, whatever order the branches finish in. Every branch is
/// driven to completion before any error is reported; the first failure in
/// `units` order wins.
pub(crate) async fn invoke_all(
    units: &[UnitRef],
    state: &StateBag,
    cx: &Context,
    limit: usize,
) -> Result<Vec<Value>> {
    log::debug!(
        "Fanning out {} branches with concurrency {}",
        units.len(),
        limit
    );
    // Unit futures are lazy, so building them up front starts nothing.
    let pending: Vec<_> = units.iter().map(|unit| unit.invoke(state, cx)).collect();
    let outcomes: Vec<Result<Value>> = stream::iter(pending)
        .buffered(limit.max(1))
        .collect()
        .await;

    outcomes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::operators::test_support::{Failing, Probe};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let units: Vec<UnitRef> = vec![
            Arc::new(Probe::new("slow", "S").delayed(40)),
            Arc::new(Probe::new("fast", "F")),
        ];
        let results = invoke_all(&units, &StateBag::new(), &Context::default(), 4)
            .await
            .unwrap();
        assert_eq!(results, vec![json!("S"), json!("F")]);
    }

    #[tokio::test]
    async fn test_limit_of_one_runs_branches_in_turn() {
        let units: Vec<UnitRef> = (0..3)
            .map(|i| Arc::new(Probe::new(&format!("p{}", i), i).delayed(30)) as UnitRef)
            .collect();
        let started = Instant::now();
        invoke_all(&units, &StateBag::new(), &Context::default(), 1)
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_failure_reported_after_every_branch_finishes() {
        let slow = Arc::new(Probe::new("slow", 1).delayed(40));
        let units: Vec<UnitRef> = vec![Arc::new(Failing::new("bad")), slow.clone()];
        let err = invoke_all(&units, &StateBag::new(), &Context::default(), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Failed(_)));
        assert_eq!(slow.finished(), 1);
    }
}
