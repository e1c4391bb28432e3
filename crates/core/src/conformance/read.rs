use std::future::Future;

use super::{seed, unique, unique_key, TestResult};
use crate::snapshot::{EntityKey, EntityType, SnapshotSummary};
use crate::store::SnapshotStore;

pub(super) async fn run_read_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "read",
            "find_latest_and_specific_versions",
            find_latest_and_specific_versions(factory).await,
        ),
        TestResult::from_result(
            "read",
            "find_missing_returns_none",
            find_missing_returns_none(factory).await,
        ),
        TestResult::from_result(
            "read",
            "list_versions_is_ascending",
            list_versions_is_ascending(factory).await,
        ),
        TestResult::from_result(
            "read",
            "list_latest_scopes_to_organisation",
            list_latest_scopes_to_organisation(factory).await,
        ),
        TestResult::from_result(
            "read",
            "list_latest_filters_type_and_limits",
            list_latest_filters_type_and_limits(factory).await,
        ),
        TestResult::from_result("read", "ping_succeeds", ping_succeeds(factory).await),
    ]
}

async fn find_latest_and_specific_versions<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::Dpr);
    seed(&store, &key, &org, 3).await?;

    let latest = store
        .find(&key, None)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("latest missing")?;
    if latest.version != 3 {
        return Err(format!("latest is v{}, expected v3", latest.version));
    }

    let second = store
        .find(&key, Some(2))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("v2 missing")?;
    if second.version != 2 || second.is_latest {
        return Err(format!("v2 read back as v{} is_latest={}", second.version, second.is_latest));
    }
    if second.data["version"] != 2 {
        return Err(format!("v2 payload mismatch: {}", second.data));
    }
    Ok(())
}

async fn find_missing_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::WorkOrder);

    if store.find(&key, None).await.map_err(|e| e.to_string())?.is_some() {
        return Err("found latest for unknown key".into());
    }
    seed(&store, &key, &org, 1).await?;
    for version in [0, 2, 99] {
        if store
            .find(&key, Some(version))
            .await
            .map_err(|e| e.to_string())?
            .is_some()
        {
            return Err(format!("found nonexistent v{version}"));
        }
    }
    let unknown = unique_key(EntityType::Dpr);
    if !store
        .list_versions(&unknown)
        .await
        .map_err(|e| e.to_string())?
        .is_empty()
    {
        return Err("unknown key listed versions".into());
    }
    Ok(())
}

async fn list_versions_is_ascending<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");
    let key = unique_key(EntityType::PaymentCertificate);
    seed(&store, &key, &org, 5).await?;

    let versions: Vec<i64> = store
        .list_versions(&key)
        .await
        .map_err(|e| e.to_string())?
        .iter()
        .map(|m| m.version)
        .collect();
    if versions != vec![1, 2, 3, 4, 5] {
        return Err(format!("versions out of order: {versions:?}"));
    }
    Ok(())
}

async fn list_latest_scopes_to_organisation<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org_a = unique("org-a");
    let org_b = unique("org-b");
    let mine = unique_key(EntityType::Dpr);
    let theirs = unique_key(EntityType::Dpr);
    seed(&store, &mine, &org_a, 2).await?;
    seed(&store, &theirs, &org_b, 1).await?;

    let listed = store
        .list_latest(&org_a, None, 100)
        .await
        .map_err(|e| e.to_string())?;
    if listed.len() != 1 {
        return Err(format!("expected 1 summary for org A, got {}", listed.len()));
    }
    if listed[0].entity_id != mine.entity_id || listed[0].version != 2 {
        return Err(format!("unexpected summary {:?}", listed[0]));
    }
    Ok(())
}

async fn list_latest_filters_type_and_limits<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let org = unique("org");

    // Seeded versions double as minute offsets, so a higher count is newer.
    let dpr_old = unique_key(EntityType::Dpr);
    let dpr_new = unique_key(EntityType::Dpr);
    let order = unique_key(EntityType::WorkOrder);
    seed(&store, &dpr_old, &org, 1).await?;
    seed(&store, &dpr_new, &org, 3).await?;
    seed(&store, &order, &org, 2).await?;

    let id = |key: &EntityKey| key.entity_id.clone();

    let all = store
        .list_latest(&org, None, 100)
        .await
        .map_err(|e| e.to_string())?;
    if ids(&all) != vec![id(&dpr_new), id(&order), id(&dpr_old)] {
        return Err(format!("unexpected newest-first order {:?}", ids(&all)));
    }

    let dprs = store
        .list_latest(&org, Some(EntityType::Dpr), 100)
        .await
        .map_err(|e| e.to_string())?;
    if ids(&dprs) != vec![id(&dpr_new), id(&dpr_old)] {
        return Err(format!("type filter returned {:?}", ids(&dprs)));
    }

    let limited = store
        .list_latest(&org, None, 1)
        .await
        .map_err(|e| e.to_string())?;
    if ids(&limited) != vec![id(&dpr_new)] {
        return Err(format!("limit 1 returned {:?}", ids(&limited)));
    }
    Ok(())
}

fn ids(summaries: &[SnapshotSummary]) -> Vec<String> {
    summaries.iter().map(|s| s.entity_id.clone()).collect()
}

async fn ping_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    factory().await.ping().await.map_err(|e| format!("ping: {e}"))
}
