//! Integration tests for media sync orchestration: full, incremental, and
//! no-op syncs, mid-sync provider swaps, retry behavior, and album syncs.

mod fixtures;

use fixtures::*;
use picker_provider_core::{args, MediaCollectionInfo};
use picker_sync::db::PickerDb;
use picker_sync::prefs::ProviderScope;
use provider_fake::{generated_rows, rows, QueryGate};
use std::sync::Arc;

fn seed_cloud_rows(env: &TestEnv, ids: &[&str]) {
    let mut op = env.db.begin_add_media(CLOUD_AUTHORITY).unwrap();
    op.execute(&rows(ids)).unwrap();
    op.set_success().unwrap();
}

#[tokio::test]
async fn test_fresh_full_sync() {
    let env = TestEnv::new();
    env.cloud.set_collection("C1", 10);
    env.cloud
        .script_media_pages(vec![generated_rows(500), generated_rows(300)]);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 800);

    let cached = env.sync_prefs().cached_collection(ProviderScope::Cloud);
    assert_eq!(cached.id.as_deref(), Some("C1"));
    assert_eq!(cached.generation, 10);
    assert_eq!(
        env.sync_prefs().resume_token(
            ProviderScope::Cloud,
            picker_sync::engine::SyncOperation::AddMedia
        ),
        None
    );

    // The provider did not change mid-sync, so cloud queries come back.
    assert_eq!(
        env.db.cloud_authority().unwrap().as_deref(),
        Some(CLOUD_AUTHORITY)
    );
}

#[tokio::test]
async fn test_noop_sync_when_cursor_matches() {
    let env = TestEnv::new();
    env.sync_prefs()
        .cache_collection(ProviderScope::Cloud, &MediaCollectionInfo::new("C1", 10))
        .unwrap();
    env.cloud.set_collection("C1", 10);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    // Beyond collection-info, the provider was never queried and nothing
    // was written.
    assert_eq!(env.cloud.collection_info_count(), 1);
    assert_eq!(env.cloud.media_query_count(), 0);
    assert_eq!(env.cloud.deleted_query_count(), 0);
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 0);
}

#[tokio::test]
async fn test_incremental_sync_adds_and_removes() {
    let env = TestEnv::new();
    seed_cloud_rows(&env, &["m1", "m2", "m3"]);
    env.sync_prefs()
        .cache_collection(ProviderScope::Cloud, &MediaCollectionInfo::new("C1", 10))
        .unwrap();

    env.cloud.set_collection("C1", 15);
    env.cloud.script_media_pages(vec![rows(&["m4"])]);
    env.cloud.script_deleted_pages(vec![rows(&["m1"])]);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    // m4 arrived, m1 left: three rows remain.
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 3);

    // Both query surfaces carried the cached generation.
    let media_queries = env.cloud.media_queries_seen();
    assert_eq!(media_queries.len(), 1);
    assert_eq!(media_queries[0].sync_generation, Some(10));
    assert_eq!(media_queries[0].page_size, Some(500));
    let deleted_queries = env.cloud.deleted_queries_seen();
    assert_eq!(deleted_queries.len(), 1);
    assert_eq!(deleted_queries[0].sync_generation, Some(10));

    let cached = env.sync_prefs().cached_collection(ProviderScope::Cloud);
    assert_eq!(cached.id.as_deref(), Some("C1"));
    assert_eq!(cached.generation, 15);
}

#[tokio::test]
async fn test_collection_change_forces_full_resync() {
    let env = TestEnv::new();
    seed_cloud_rows(&env, &["m1", "m2"]);
    env.sync_prefs()
        .cache_collection(ProviderScope::Cloud, &MediaCollectionInfo::new("C1", 10))
        .unwrap();

    env.cloud.set_collection("C2", 3);
    env.cloud.script_media_pages(vec![rows(&["n1", "n2", "n3"])]);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    // The old collection's rows are gone wholesale.
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 3);
    // No deletion phase on a full sync.
    assert_eq!(env.cloud.deleted_query_count(), 0);

    let cached = env.sync_prefs().cached_collection(ProviderScope::Cloud);
    assert_eq!(cached.id.as_deref(), Some("C2"));
    assert_eq!(cached.generation, 3);
}

#[tokio::test]
async fn test_mid_sync_provider_swap_leaves_cloud_disabled() {
    let env = TestEnv::new();
    let other = env.register_other_cloud();
    let controller = Arc::new(env.controller().await);
    assert!(controller.set_cloud_provider(Some(CLOUD_AUTHORITY)).await);

    env.cloud.set_collection("C1", 10);
    env.cloud
        .script_media_pages(vec![rows(&["m1", "m2"]), rows(&["m3"])]);

    // Park the sync between its first and second page.
    let gate = QueryGate::new();
    env.cloud.set_query_gate(2, gate.clone());

    let sync_task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.sync_all_media_from_cloud().await })
    };

    gate.reached.notified().await;
    // The user switches providers while page two is in flight.
    assert!(controller.set_cloud_provider(Some(OTHER_CLOUD_AUTHORITY)).await);
    gate.release.notify_one();

    assert!(sync_task.await.unwrap());

    // Neither the old nor the new provider is queryable: the facade stays
    // dark until a sync of the new provider succeeds.
    assert_eq!(env.db.cloud_authority().unwrap(), None);
    // The swapped-out run did not cache a cursor for the new provider.
    assert_eq!(
        env.sync_prefs().cached_collection(ProviderScope::Cloud).id,
        None
    );

    // The next sync plans against the new provider from its own state.
    other.set_collection("D1", 1);
    other.script_media_pages(vec![rows(&["x1"])]);
    assert!(controller.sync_all_media_from_cloud().await);

    assert_eq!(
        env.db.cloud_authority().unwrap().as_deref(),
        Some(OTHER_CLOUD_AUTHORITY)
    );
    let cached = env.sync_prefs().cached_collection(ProviderScope::Cloud);
    assert_eq!(cached.id.as_deref(), Some("D1"));
    assert_eq!(cached.generation, 1);
}

#[tokio::test]
async fn test_unhonored_generation_retries_as_full_sync() {
    let env = TestEnv::new();
    env.sync_prefs()
        .cache_collection(ProviderScope::Cloud, &MediaCollectionInfo::new("C1", 10))
        .unwrap();

    env.cloud.set_collection("C1", 15);
    env.cloud.script_media_pages(vec![rows(&["m1", "m2"])]);
    env.cloud.script_deleted_pages(vec![vec![]]);
    // The provider silently ignores sync_generation, so the incremental
    // attempt dies; the reset-and-retry runs as a full sync which does not
    // need it.
    env.cloud.omit_honored_arg(args::SYNC_GENERATION);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    assert_eq!(env.cloud.collection_info_count(), 2);
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 2);
    let cached = env.sync_prefs().cached_collection(ProviderScope::Cloud);
    assert_eq!(cached.id.as_deref(), Some("C1"));
    assert_eq!(cached.generation, 15);
}

#[tokio::test]
async fn test_retry_failure_reports_and_leaves_cursor_unadvanced() {
    let env = TestEnv::new();
    env.sync_prefs()
        .cache_collection(ProviderScope::Cloud, &MediaCollectionInfo::new("C1", 10))
        .unwrap();

    env.cloud.set_collection("C1", 15);
    env.cloud.script_media_pages(vec![rows(&["m1"])]);
    // Nothing required is honored, so the retry fails too.
    env.cloud.omit_honored_arg(args::SYNC_GENERATION);
    env.cloud.omit_honored_arg(args::PAGE_SIZE);

    let controller = env.controller().await;
    assert!(!controller.sync_all_media_from_cloud().await);

    // Exactly one retry happened.
    assert_eq!(env.cloud.collection_info_count(), 2);
    // The aborted runs never advanced the cursor to generation 15.
    let cached = env.sync_prefs().cached_collection(ProviderScope::Cloud);
    assert_ne!(cached.generation, 15);
    // Cloud queries stay off after a failed sync.
    assert_eq!(env.db.cloud_authority().unwrap(), None);
}

#[tokio::test]
async fn test_provider_outage_retries_once_then_fails() {
    let env = TestEnv::new();
    env.cloud.set_collection("C1", 10);
    env.cloud.fail_queries("simulated outage");

    let controller = env.controller().await;
    assert!(!controller.sync_all_media_from_cloud().await);
    assert_eq!(env.cloud.media_query_count(), 2);

    // Once the provider recovers the next sync lands normally.
    env.cloud.clear_query_failure();
    env.cloud.script_media_pages(vec![rows(&["m1"])]);
    assert!(controller.sync_all_media_from_cloud().await);
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 1);
}

#[tokio::test]
async fn test_local_sync_does_not_enforce_paging() {
    let env = TestEnv::new();
    env.local.set_collection("L1", 1);
    env.local.script_media_pages(vec![rows(&["l1", "l2"])]);
    // A local provider may ignore page_size; local syncs don't require it.
    env.local.omit_honored_arg(args::PAGE_SIZE);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_local().await);

    assert_eq!(env.db.count_media(LOCAL_AUTHORITY).unwrap(), 2);
    let cached = env.sync_prefs().cached_collection(ProviderScope::Local);
    assert_eq!(cached.id.as_deref(), Some("L1"));
}

#[tokio::test]
async fn test_sync_all_media_runs_local_then_cloud() {
    let env = TestEnv::new();
    env.local.set_collection("L1", 1);
    env.local.script_media_pages(vec![rows(&["l1"])]);
    env.cloud.set_collection("C1", 1);
    env.cloud.script_media_pages(vec![rows(&["c1", "c2"])]);

    let controller = env.controller().await;
    assert!(controller.sync_all_media().await);

    assert_eq!(env.db.count_media(LOCAL_AUTHORITY).unwrap(), 1);
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 2);
    assert_eq!(
        env.db.cloud_authority().unwrap().as_deref(),
        Some(CLOUD_AUTHORITY)
    );
}

#[tokio::test]
async fn test_cloud_sync_without_provider_resets_cloud_rows() {
    let mut config = default_config();
    config.picker.allowed_cloud_packages = vec![];
    let env = TestEnv::with_config(config);
    seed_cloud_rows(&env, &["stale1", "stale2"]);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    // With no provider set, the sync clears out whatever a previous
    // provider left behind.
    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 0);
    assert_eq!(env.cloud.media_query_count(), 0);
}

#[tokio::test]
async fn test_album_sync_local() {
    let env = TestEnv::new();
    env.local.set_collection("L1", 1);
    env.local.script_album_pages("camera", vec![rows(&["a1", "a2"])]);

    let controller = env.controller().await;
    assert!(controller.sync_album_media("camera", true).await);
    assert_eq!(
        env.db.count_album_media(LOCAL_AUTHORITY, Some("camera")).unwrap(),
        2
    );

    // A re-sync starts from scratch rather than accumulating.
    env.local.script_album_pages("camera", vec![rows(&["a3"])]);
    assert!(controller.sync_album_media("camera", true).await);
    assert_eq!(
        env.db.count_album_media(LOCAL_AUTHORITY, Some("camera")).unwrap(),
        1
    );
}

#[tokio::test]
async fn test_album_sync_cloud_enforces_paging() {
    let env = TestEnv::new();
    let controller = env.controller().await;

    env.cloud.set_collection("C1", 1);
    env.cloud.script_album_pages("holiday", vec![rows(&["c1"])]);
    env.cloud.omit_honored_arg(args::PAGE_SIZE);

    // Cloud album syncs require honored paging; local ones don't.
    assert!(!controller.sync_album_media("holiday", false).await);

    env.local.set_collection("L1", 1);
    env.local.script_album_pages("holiday", vec![rows(&["l1"])]);
    env.local.omit_honored_arg(args::PAGE_SIZE);
    assert!(controller.sync_album_media("holiday", true).await);
}

#[tokio::test]
async fn test_album_sync_without_cloud_provider_resets_only() {
    let mut config = default_config();
    config.picker.allowed_cloud_packages = vec![];
    let env = TestEnv::with_config(config);

    // Stale album rows from a previous provider.
    let mut op = env
        .db
        .begin_add_album_media(CLOUD_AUTHORITY, "holiday")
        .unwrap();
    op.execute(&rows(&["old"])).unwrap();
    op.set_success().unwrap();
    drop(op);

    let controller = env.controller().await;
    assert!(controller.sync_album_media("holiday", false).await);

    assert_eq!(
        env.db.count_album_media(CLOUD_AUTHORITY, Some("holiday")).unwrap(),
        0
    );
}

#[tokio::test]
async fn test_cloud_sync_resets_album_media_for_both_providers() {
    let env = TestEnv::new();
    let controller = env.controller().await;

    // Album content synced earlier for both providers.
    env.local.set_collection("L1", 1);
    env.local.script_album_pages("camera", vec![rows(&["l1"])]);
    assert!(controller.sync_album_media("camera", true).await);
    env.cloud.set_collection("C1", 1);
    env.cloud.script_album_pages("holiday", vec![rows(&["c1"])]);
    assert!(controller.sync_album_media("holiday", false).await);

    env.cloud.set_collection("C1", 2);
    env.cloud.script_media_pages(vec![rows(&["m1"])]);
    assert!(controller.sync_all_media_from_cloud().await);

    // Albums re-sync lazily after a cloud media sync.
    assert_eq!(env.db.count_album_media(LOCAL_AUTHORITY, None).unwrap(), 0);
    assert_eq!(env.db.count_album_media(CLOUD_AUTHORITY, None).unwrap(), 0);
}

#[tokio::test]
async fn test_reset_all_media_clears_everything() {
    let env = TestEnv::new();
    seed_cloud_rows(&env, &["m1", "m2"]);
    env.sync_prefs()
        .cache_collection(ProviderScope::Cloud, &MediaCollectionInfo::new("C1", 10))
        .unwrap();
    env.sync_prefs()
        .cache_collection(ProviderScope::Local, &MediaCollectionInfo::new("L1", 2))
        .unwrap();

    let controller = env.controller().await;
    assert!(controller.reset_all_media().await);

    assert_eq!(env.db.count_media(CLOUD_AUTHORITY).unwrap(), 0);
    assert_eq!(env.db.count_media(LOCAL_AUTHORITY).unwrap(), 0);
    assert_eq!(env.sync_prefs().cached_collection(ProviderScope::Cloud).id, None);
    assert_eq!(env.sync_prefs().cached_collection(ProviderScope::Local).id, None);
}

#[tokio::test]
async fn test_pages_are_fetched_exactly_once() {
    let env = TestEnv::new();
    env.cloud.set_collection("C1", 5);
    env.cloud.script_media_pages(vec![
        rows(&["m1"]),
        rows(&["m2"]),
        rows(&["m3"]),
    ]);

    let controller = env.controller().await;
    assert!(controller.sync_all_media_from_cloud().await);

    // One query per page, each with a distinct token.
    let queries = env.cloud.media_queries_seen();
    assert_eq!(queries.len(), 3);
    let tokens: Vec<_> = queries.iter().map(|q| q.page_token.clone()).collect();
    assert_eq!(tokens, vec![None, Some("p1".to_string()), Some("p2".to_string())]);
}
