use std::future::Future;
use std::sync::Arc;

use super::{make_snapshot, seed, unique, unique_key, TestResult};
use crate::snapshot::EntityType;
use crate::store::{SnapshotStore, StoreError};

/// Number of concurrent tasks to spawn in each case.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_first_claims_exactly_one_wins",
            concurrent_claims_exactly_one_wins(factory, 0).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_next_claims_exactly_one_wins",
            concurrent_claims_exactly_one_wins(factory, 2).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_claims_on_different_keys_all_succeed",
            concurrent_claims_on_different_keys_all_succeed(factory).await,
        ),
    ]
}

/// N tasks race to claim the version after `seeded`. Exactly one wins, the
/// rest get `Conflict`, and exactly one latest record remains.
async fn concurrent_claims_exactly_one_wins<S, F, Fut>(factory: &F, seeded: i64) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let org = unique("org");
    let key = unique_key(EntityType::Dpr);
    seed(store.as_ref(), &key, &org, seeded).await?;

    let expected = (seeded > 0).then_some(seeded);
    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        let mut snapshot = make_snapshot(&key, seeded + 1, &org);
        snapshot.generated_by = format!("racer-{i}");
        handles.push(tokio::spawn(async move {
            match s.claim_and_insert(expected, &snapshot).await {
                Ok(()) => Ok(true),
                Err(StoreError::Conflict { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }

    let metas = store.list_versions(&key).await.map_err(|e| e.to_string())?;
    if metas.len() as i64 != seeded + 1 {
        return Err(format!("expected {} versions, found {}", seeded + 1, metas.len()));
    }
    let latest_count = metas.iter().filter(|m| m.is_latest).count();
    if latest_count != 1 {
        return Err(format!("expected exactly 1 latest, found {latest_count}"));
    }
    Ok(())
}

/// N tasks claim version 1 of N different keys. No false conflicts.
async fn concurrent_claims_on_different_keys_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let org = unique("org");

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        let snapshot = make_snapshot(&unique_key(EntityType::WorkOrder), 1, &org);
        handles.push(tokio::spawn(async move {
            s.claim_and_insert(None, &snapshot).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
    }

    let listed = store
        .list_latest(&org, Some(EntityType::WorkOrder), 100)
        .await
        .map_err(|e| e.to_string())?;
    if listed.len() != N {
        return Err(format!("expected {N} summaries, got {}", listed.len()));
    }
    Ok(())
}
