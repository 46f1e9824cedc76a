//! End-to-end lifecycle tests: register, publish, walk periods and
//! versions, all without a validator.

use rill_core::{raw_name_hash, update_key, ChunkKey};
use rill_resource::ResourceError;
use rill_store::StoreError;
use rill_tests::TestSetup;

/// Initialize tracing for tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rill_resource=trace,rill_store=debug")
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_register_and_read_root() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    let rsrc = setup.handler.new_resource("foo.bar", 42).await.unwrap();
    assert_eq!(rsrc.start_block, 4200);
    assert_eq!(rsrc.frequency, 42);
    assert!(rsrc.is_synced());

    // the root chunk is keyed by the namehash and holds exactly
    // start_block ‖ frequency, little-endian
    let root_key = ChunkKey::from(raw_name_hash("foo.bar"));
    let chunk = setup.local.get(&root_key).unwrap().unwrap();
    assert_eq!(
        chunk.data,
        hex::decode("a8100000000000002a00000000000000").unwrap()
    );

    // no update published yet: the walk over period 1 comes up empty
    let result = setup.handler.lookup_latest_by_name("foo.bar", true).await;
    assert!(matches!(result, Err(ResourceError::NoUpdates)));
}

#[tokio::test]
async fn test_publish_and_fetch() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();

    setup.oracle.set_height(4242);
    let key = setup.handler.update("foo.bar", b"hello").await.unwrap();

    // block 4242 falls into period 2, first update takes version 1
    let expected = update_key(2, 1, &raw_name_hash("foo.bar"));
    assert_eq!(key, expected);

    let rsrc = setup
        .handler
        .lookup_latest_by_name("foo.bar", false)
        .await
        .unwrap();
    assert_eq!(rsrc.last_period, 2);
    assert_eq!(rsrc.version, 1);
    assert_eq!(rsrc.data, b"hello");

    let (content_key, content) = setup.handler.get_content("foo.bar").unwrap();
    assert_eq!(content_key, key);
    assert_eq!(content, b"hello");
}

#[tokio::test]
async fn test_version_bump_within_period() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();

    setup.oracle.set_height(4242);
    setup.handler.update("foo.bar", b"hello").await.unwrap();
    let key2 = setup.handler.update("foo.bar", b"world").await.unwrap();
    assert_eq!(key2, update_key(2, 2, &raw_name_hash("foo.bar")));

    // a latest-lookup walks versions upward from 1 and keeps the last hit
    let rsrc = setup
        .handler
        .lookup_latest_by_name("foo.bar", false)
        .await
        .unwrap();
    assert_eq!(rsrc.last_period, 2);
    assert_eq!(rsrc.version, 2);
    assert_eq!(rsrc.data, b"world");

    assert_eq!(setup.handler.get_last_period("foo.bar").unwrap(), 2);
    assert_eq!(setup.handler.get_version("foo.bar").unwrap(), 2);
}

#[tokio::test]
async fn test_historical_walk_over_empty_periods() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();

    setup.oracle.set_height(4242);
    setup.handler.update("foo.bar", b"hello").await.unwrap();
    setup.handler.update("foo.bar", b"world").await.unwrap();

    // two periods later, no further updates: the walk starts at period 4,
    // misses 4 and 3, and lands on period 2 version 2
    setup.oracle.set_height(4326);
    let rsrc = setup
        .handler
        .lookup_latest_by_name("foo.bar", false)
        .await
        .unwrap();
    assert_eq!(rsrc.last_period, 2);
    assert_eq!(rsrc.version, 2);
    assert_eq!(rsrc.data, b"world");
}

#[tokio::test]
async fn test_lookup_historical_and_specific_version() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();

    setup.oracle.set_height(4242);
    setup.handler.update("foo.bar", b"hello").await.unwrap();
    setup.handler.update("foo.bar", b"world").await.unwrap();

    let latest_in_period = setup
        .handler
        .lookup_historical_by_name("foo.bar", 2, false)
        .await
        .unwrap();
    assert_eq!(latest_in_period.version, 2);

    let pinned = setup
        .handler
        .lookup_version_by_name("foo.bar", 2, 1, false)
        .await
        .unwrap();
    assert_eq!(pinned.version, 1);
    assert_eq!(pinned.data, b"hello");
}

#[tokio::test]
async fn test_lookup_by_namehash() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();
    setup.oracle.set_height(4242);
    setup.handler.update("foo.bar", b"hello").await.unwrap();

    let name_hash = raw_name_hash("foo.bar");
    let rsrc = setup
        .handler
        .lookup_latest(name_hash, "foo.bar", false)
        .await
        .unwrap();
    assert_eq!(rsrc.data, b"hello");
}

#[tokio::test]
async fn test_lookup_survives_index_refresh() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();
    setup.oracle.set_height(4242);
    setup.handler.update("foo.bar", b"hello").await.unwrap();

    // a refreshing lookup reloads start block and frequency from the root
    // chunk instead of trusting the cached entry
    let rsrc = setup
        .handler
        .lookup_latest_by_name("foo.bar", true)
        .await
        .unwrap();
    assert_eq!(rsrc.start_block, 4200);
    assert_eq!(rsrc.frequency, 42);
    assert_eq!(rsrc.data, b"hello");
    assert!(rsrc.is_synced());
}

#[tokio::test]
async fn test_period_arithmetic_accessors() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();

    assert_eq!(setup.handler.block_to_period("foo.bar", 4242).unwrap(), 2);
    assert_eq!(setup.handler.block_to_period("foo.bar", 4326).unwrap(), 4);
    assert_eq!(setup.handler.period_to_block("foo.bar", 3).unwrap(), 4326);
    assert_eq!(setup.handler.get_block().await.unwrap(), 4200);
}

#[tokio::test]
async fn test_lookup_unknown_root_is_not_found() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    let result = setup.handler.lookup_latest_by_name("ghost.name", false).await;
    assert!(matches!(
        result,
        Err(ResourceError::Store(StoreError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_update_requires_synced_resource() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    let result = setup.handler.update("foo.bar", b"data").await;
    assert!(matches!(result, Err(ResourceError::NotSynced(_))));
}

#[tokio::test]
async fn test_zero_period_lookup_rejected() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.new_resource("foo.bar", 42).await.unwrap();

    let result = setup
        .handler
        .lookup_historical_by_name("foo.bar", 0, false)
        .await;
    assert!(matches!(result, Err(ResourceError::ZeroPeriod)));
}

#[tokio::test]
async fn test_close_cancels_oracle_queries() {
    init_tracing();

    let setup = TestSetup::new(4200, None).unwrap();
    setup.handler.close().await;
    assert!(matches!(
        setup.handler.get_block().await,
        Err(ResourceError::Closed)
    ));
}
