//! End-to-end ingestion: fake node, both workers, one on-disk store.

use std::sync::Arc;
use std::time::Duration;

use blockflow::node::fake::FakeNodeApi;
use blockflow::repository::BlockRepository;
use blockflow::shutdown;
use blockflow::store::Store;
use blockflow::streams::StreamComposer;
use blockflow::workers::{backfill, subscription, BackfillConfig, WorkerHealth};

const START_SLOT: i64 = 12;

async fn wait_until(mut condition: impl FnMut() -> bool, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn test_live_feed_plus_backfill_leaves_no_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("ingest.db")).unwrap();
    let repository =
        BlockRepository::new(store.clone()).with_poll_interval(Duration::from_millis(20));

    let api = Arc::new(FakeNodeApi::new(START_SLOT, Duration::from_millis(30)));
    let health = WorkerHealth::new();
    let (signal, token) = shutdown::channel();

    let subscription_handle = tokio::spawn(subscription::run(
        api.clone() as Arc<dyn blockflow::node::NodeApi>,
        repository.clone(),
        health.clone(),
        token.clone(),
    ));
    let backfill_handle = tokio::spawn(backfill::run(
        api,
        repository.clone(),
        BackfillConfig {
            batch_size: 5,
            poll_interval: Duration::from_millis(20),
        },
        health.clone(),
        token,
    ));

    // The backfill waits for the subscription's first block, then walks down
    // to genesis.
    let health_check = health.clone();
    assert!(
        wait_until(move || health_check.backfill_complete(), Duration::from_secs(10)).await,
        "backfill should complete against the fake node"
    );
    assert!(health.subscription_live());

    // Let the live feed advance a few more slots.
    let live_repo = repository.clone();
    assert!(
        wait_until(
            move || {
                live_repo
                    .get_latest(1, false)
                    .unwrap()
                    .first()
                    .map(|block| block.slot >= START_SLOT + 3)
                    .unwrap_or(false)
            },
            Duration::from_secs(10)
        )
        .await
    );

    // A late consumer sees a contiguous stream: bootstrap, then live tail.
    let mut composer = StreamComposer::blocks(&repository, 3).unwrap();
    let chunk = composer.next_chunk().await.unwrap();
    let bootstrap_slots: Vec<i64> = String::from_utf8(chunk)
        .unwrap()
        .lines()
        .map(|line| {
            serde_json::from_str::<blockflow::models::Block>(line)
                .unwrap()
                .slot
        })
        .collect();
    assert_eq!(bootstrap_slots.len(), 3);
    assert!(bootstrap_slots.windows(2).all(|w| w[1] == w[0] + 1));

    let chunk = tokio::time::timeout(Duration::from_secs(5), composer.next_chunk())
        .await
        .expect("live tail should produce a chunk")
        .unwrap();
    let tail_first: blockflow::models::Block =
        serde_json::from_str(String::from_utf8(chunk).unwrap().lines().next().unwrap()).unwrap();
    assert_eq!(tail_first.slot, bootstrap_slots[2] + 1);

    signal.trigger();
    assert!(subscription_handle.await.unwrap().is_ok());
    assert!(backfill_handle.await.unwrap().is_ok());
    assert!(!health.subscription_live());

    // Gap-free from genesis to the live tail.
    let latest = repository.get_latest(1, false).unwrap().remove(0);
    let count = repository.count_in_slot_range(0, latest.slot).unwrap();
    assert_eq!(count, latest.slot + 1);
}
