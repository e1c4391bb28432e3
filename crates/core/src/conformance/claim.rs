use std::future::Future;

use super::{make_snapshot, seed, unique, unique_key, TestResult};
use crate::checksum::compute_data_checksum;
use crate::snapshot::EntityType;
use crate::store::{SnapshotStore, StoreError};

pub(super) async fn run_claim_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "claim",
            "first_claim_creates_counter_and_latest",
            first_claim_creates_counter_and_latest(factory).await,
        ),
        TestResult::from_result(
            "claim",
            "sequential_claims_move_latest_flag",
            sequential_claims_move_latest_flag(factory).await,
        ),
        TestResult::from_result(
            "claim",
            "stale_claim_conflicts",
            stale_claim_conflicts(factory).await,
        ),
        TestResult::from_result(
            "claim",
            "duplicate_first_claim_conflicts",
            duplicate_first_claim_conflicts(factory).await,
        ),
        TestResult::from_result(
            "claim",
            "failed_claim_leaves_nothing_visible",
            failed_claim_leaves_nothing_visible(factory).await,
        ),
        TestResult::from_result(
            "claim",
            "stored_snapshot_round_trips",
            stored_snapshot_round_trips(factory).await,
        ),
    ]
}

async fn first_claim_creates_counter_and_latest<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::Dpr);

    if store.read_counter(&key).await.map_err(|e| e.to_string())?.is_some() {
        return Err("fresh key already has a counter".into());
    }

    store
        .claim_and_insert(None, &make_snapshot(&key, 1, &org))
        .await
        .map_err(|e| format!("claim: {e}"))?;

    let counter = store
        .read_counter(&key)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("counter missing after claim")?;
    if counter.current_version != 1 || counter.organisation_id != org {
        return Err(format!("unexpected counter {counter:?}"));
    }

    let latest = store
        .find(&key, None)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("latest missing after claim")?;
    if latest.version != 1 || !latest.is_latest {
        return Err(format!("latest is v{} is_latest={}", latest.version, latest.is_latest));
    }
    Ok(())
}

async fn sequential_claims_move_latest_flag<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::WorkOrder);
    seed(&store, &key, &org, 3).await?;

    let metas = store.list_versions(&key).await.map_err(|e| e.to_string())?;
    let flags: Vec<(i64, bool)> = metas.iter().map(|m| (m.version, m.is_latest)).collect();
    if flags != vec![(1, false), (2, false), (3, true)] {
        return Err(format!("unexpected version flags {flags:?}"));
    }

    let counter = store
        .read_counter(&key)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("counter missing")?;
    if counter.current_version != 3 {
        return Err(format!("counter at {}, expected 3", counter.current_version));
    }
    Ok(())
}

async fn stale_claim_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::PaymentCertificate);
    seed(&store, &key, &org, 2).await?;

    match store.claim_and_insert(Some(1), &make_snapshot(&key, 2, &org)).await {
        Err(StoreError::Conflict { .. }) => Ok(()),
        Ok(()) => Err("stale claim succeeded".into()),
        Err(e) => Err(format!("expected Conflict, got {e}")),
    }
}

async fn duplicate_first_claim_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::Dpr);
    seed(&store, &key, &org, 1).await?;

    match store.claim_and_insert(None, &make_snapshot(&key, 1, &org)).await {
        Err(StoreError::Conflict { .. }) => Ok(()),
        Ok(()) => Err("second first-claim succeeded".into()),
        Err(e) => Err(format!("expected Conflict, got {e}")),
    }
}

async fn failed_claim_leaves_nothing_visible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::WorkOrder);
    seed(&store, &key, &org, 2).await?;

    let _ = store.claim_and_insert(Some(1), &make_snapshot(&key, 2, &org)).await;

    let metas = store.list_versions(&key).await.map_err(|e| e.to_string())?;
    if metas.len() != 2 {
        return Err(format!("expected 2 versions, found {}", metas.len()));
    }
    let latest = store
        .find(&key, None)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("latest missing")?;
    if latest.version != 2 {
        return Err(format!("latest moved to v{}", latest.version));
    }
    let counter = store
        .read_counter(&key)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("counter missing")?;
    if counter.current_version != 2 {
        return Err(format!("counter moved to {}", counter.current_version));
    }
    Ok(())
}

async fn stored_snapshot_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::Dpr);
    let mut original = make_snapshot(&key, 1, &org);
    original.pdf_checksum = Some(crate::checksum::sha256_hex(b"rendered pdf"));
    original.data = serde_json::json!({
        "entity": key.entity_id,
        "readings": [
            971986.3718547629,
            11935.154727148345,
            223957.83553697602,
            1.0715660391465826e-75,
            -1.603964615428183e+143,
        ],
        "count": 4,
        "ratio": 4.0,
    });
    original.data_checksum = compute_data_checksum(&original.data);

    store
        .claim_and_insert(None, &original)
        .await
        .map_err(|e| format!("claim: {e}"))?;

    let stored = store
        .find(&key, Some(1))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("v1 missing")?;
    if stored != original {
        return Err(format!("stored snapshot differs:\n{stored:?}\nvs\n{original:?}"));
    }
    let recomputed = compute_data_checksum(&stored.data);
    if recomputed != original.data_checksum {
        return Err(format!(
            "checksum drifted after storage: {recomputed} vs {}",
            original.data_checksum
        ));
    }
    Ok(())
}
