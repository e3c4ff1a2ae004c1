use std::sync::Arc;
use std::time::Duration;

use batch_controller::Controller;
use batch_controller::ControllerState;
use batch_controller::Deleted;
use batch_controller::OperationKind;
use batch_controller::WatchEvent;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::pods_config;
use crate::common::spawn_controller;
use crate::common::wait_for_running;
use crate::common::wait_until;
use crate::common::CollectingHandler;
use crate::common::Pod;
use crate::common::PodSource;
use crate::common::WAIT_TIMEOUT;

fn pods(count: usize) -> Vec<Pod> {
    (0..count).map(|i| Pod::new("default", &format!("pod-{i}"))).collect()
}

/// Case 1: a pool of workers drains the initial listing. Every object is
/// delivered exactly once and no batch exceeds the configured bound.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_listing_is_delivered_once_across_workers() {
    const MAX_BATCH: usize = 8;
    let handler = CollectingHandler::default();
    let (source, _tx) = PodSource::new(pods(100));
    let controller = Arc::new(
        Controller::new(&pods_config(MAX_BATCH, 4), source)
            .unwrap()
            .with_handler(handler.clone()),
    );
    let stop = CancellationToken::new();

    let running = spawn_controller(&controller, 4, &stop);

    assert!(wait_until(|| handler.delivered_keys(OperationKind::Create).len() >= 100).await);
    let delivered = handler.delivered_keys(OperationKind::Create);
    assert_eq!(delivered.len(), 100);
    assert_eq!(handler.distinct_keys(OperationKind::Create).len(), 100);
    for (kind, keys) in handler.batches() {
        assert_eq!(kind, OperationKind::Create);
        assert!(keys.len() <= MAX_BATCH, "batch of {} exceeds bound", keys.len());
    }

    stop.cancel();
    timeout(WAIT_TIMEOUT, running).await.unwrap().unwrap().unwrap();
    assert_eq!(controller.state(), ControllerState::Stopped);
}

/// Case 2: watch traffic is grouped by kind; deletes of objects already gone
/// from the snapshot never reach the delete handler.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_events_are_grouped_by_kind() {
    let handler = CollectingHandler::default();
    let initial = pods(10);
    let (source, tx) = PodSource::new(initial.clone());
    let controller = Arc::new(
        Controller::new(&pods_config(4, 2), source)
            .unwrap()
            .with_handler(handler.clone()),
    );
    let stop = CancellationToken::new();
    let running = spawn_controller(&controller, 2, &stop);
    assert!(wait_until(|| handler.delivered_keys(OperationKind::Create).len() == 10).await);

    for pod in &initial {
        let mut next = pod.clone();
        next.generation += 1;
        tx.send(WatchEvent::Modified(next)).await.unwrap();
    }
    assert!(wait_until(|| handler.distinct_keys(OperationKind::Update).len() == 10).await);

    for pod in &initial[..3] {
        tx.send(WatchEvent::Deleted(Deleted::Object(pod.clone()))).await.unwrap();
    }
    assert!(wait_until(|| controller.store().len() == 7 && controller.queue().is_empty()).await);
    // let the workers finish the cycles that consumed the delete markers
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handler.delivered_keys(OperationKind::Delete).is_empty());

    stop.cancel();
    timeout(WAIT_TIMEOUT, running).await.unwrap().unwrap().unwrap();
}

/// Case 3: an idle pool stops promptly once the shutdown signal fires
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_idle_pool_shuts_down_promptly() {
    let (source, _tx) = PodSource::new(vec![]);
    let controller = Arc::new(Controller::new(&pods_config(16, 8), source).unwrap());
    let stop = CancellationToken::new();

    let running = spawn_controller(&controller, 8, &stop);
    wait_for_running(&controller).await;

    stop.cancel();
    timeout(Duration::from_secs(1), running).await.unwrap().unwrap().unwrap();
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert!(controller.queue().is_shutting_down());
}

/// Case 4: shutdown waits for the handler call already in flight
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_waits_for_in_flight_batch() {
    let handler = CollectingHandler::with_delay(Duration::from_millis(300));
    let (source, _tx) = PodSource::new(pods(1));
    let controller = Arc::new(
        Controller::new(&pods_config(1, 1), source)
            .unwrap()
            .with_handler(handler.clone()),
    );
    let stop = CancellationToken::new();
    let running = spawn_controller(&controller, 1, &stop);

    // marker taken from the queue, handler still sleeping
    assert!(wait_until(|| controller.state() == ControllerState::Running && controller.queue().is_empty()).await);
    stop.cancel();

    timeout(WAIT_TIMEOUT, running).await.unwrap().unwrap().unwrap();
    assert_eq!(handler.delivered_keys(OperationKind::Create), vec!["default/pod-0".to_string()]);
}
