use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mqload_core::config::{BrokerConfig, LoadConfig};
use mqload_core::error::{ConnectError, Error, PublishError};
use mqload_core::publish::{BoxFuture, Connector, DiscardConnector, PublishRequest, Publisher};
use mqload_core::runner::{RunStats, StopSignal, run_load};

/// Records every published message id and fails the configured workers' connects and every
/// `fail_every`-th publish.
#[derive(Default)]
struct RecordingConnector {
    refuse_workers: HashSet<u64>,
    fail_every: Option<u64>,
    publish_delay: Option<Duration>,
    seen: Arc<Mutex<Vec<(u64, String)>>>,
    connects: AtomicU64,
}

struct RecordingPublisher {
    worker_id: u64,
    fail_every: Option<u64>,
    publish_delay: Option<Duration>,
    attempts: u64,
    seen: Arc<Mutex<Vec<(u64, String)>>>,
}

impl Connector for RecordingConnector {
    fn connect(&self, worker_id: u64) -> BoxFuture<'_, Result<Box<dyn Publisher>, ConnectError>> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            if self.refuse_workers.contains(&worker_id) {
                return Err(ConnectError(format!("worker {worker_id}: connection refused")));
            }
            Ok(Box::new(RecordingPublisher {
                worker_id,
                fail_every: self.fail_every,
                publish_delay: self.publish_delay,
                attempts: 0,
                seen: self.seen.clone(),
            }) as Box<dyn Publisher>)
        })
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, req: PublishRequest) -> BoxFuture<'_, Result<(), PublishError>> {
        Box::pin(async move {
            if let Some(delay) = self.publish_delay {
                tokio::time::sleep(delay).await;
            }
            self.attempts += 1;
            if self.fail_every.is_some_and(|n| self.attempts % n == 0) {
                return Err(PublishError("nack".to_string()));
            }

            let v: serde_json::Value = serde_json::from_slice(&req.body)
                .unwrap_or_else(|e| panic!("body must be json: {e}"));
            let id = v["messageId"]
                .as_str()
                .unwrap_or_else(|| panic!("messageId missing"))
                .to_string();
            assert_eq!(req.routing_key, format!("room.{}", req.destination_id));
            assert_eq!(req.content_type, "application/json");

            self.seen
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((self.worker_id, id));
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

async fn run(
    load: LoadConfig,
    connector: Arc<dyn Connector>,
    cancel: Arc<StopSignal>,
) -> mqload_core::runner::RunResult {
    run_load(
        &load,
        &BrokerConfig::default(),
        connector,
        Arc::new(RunStats::default()),
        cancel,
    )
    .await
    .unwrap_or_else(|e| panic!("run_load failed: {e}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn even_split_round_robin_destinations() {
    let connector = Arc::new(RecordingConnector::default());
    let result = run(
        LoadConfig::new(1000, 4, 2),
        connector.clone(),
        Arc::new(StopSignal::new()),
    )
    .await;

    let shares: Vec<u64> = result.workers.iter().map(|w| w.share).collect();
    let destinations: Vec<u64> = result.workers.iter().map(|w| w.destination_id).collect();
    assert_eq!(shares, vec![250, 250, 250, 250]);
    assert_eq!(destinations, vec![1, 2, 1, 2]);
    assert_eq!(result.total_sent, 1000);
    assert_eq!(result.total_failed, 0);
    assert!(!result.cancelled);
    assert_eq!(result.publish_latencies_ms.len(), 1000);
    assert!(result.finished_at >= result.started_at);

    let seen = connector
        .seen
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let unique: HashSet<&String> = seen.iter().map(|(_, id)| id).collect();
    assert_eq!(unique.len(), 1000, "message ids must be unique across the run");
    assert!(unique.contains(&"msg_2_3_249".to_string()));
}

#[tokio::test]
async fn messages_of_one_worker_are_in_sequence_order() {
    let connector = Arc::new(RecordingConnector::default());
    run(
        LoadConfig::new(30, 3, 3),
        connector.clone(),
        Arc::new(StopSignal::new()),
    )
    .await;

    let seen = connector
        .seen
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for worker in 0..3u64 {
        let ids: Vec<&String> = seen
            .iter()
            .filter(|(w, _)| *w == worker)
            .map(|(_, id)| id)
            .collect();
        let expected: Vec<String> = (0..10)
            .map(|seq| format!("msg_{}_{worker}_{seq}", worker + 1))
            .collect();
        assert_eq!(ids, expected.iter().collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn failed_connect_fails_whole_share_only() {
    let connector = Arc::new(RecordingConnector {
        refuse_workers: HashSet::from([2]),
        ..RecordingConnector::default()
    });
    let result = run(
        LoadConfig::new(1000, 4, 2),
        connector,
        Arc::new(StopSignal::new()),
    )
    .await;

    assert_eq!(result.total_failed, 250);
    assert_eq!(result.total_sent, 750);
    for w in &result.workers {
        if w.worker_id == 2 {
            assert_eq!((w.sent, w.failed), (0, 250));
            assert!(w.connect_error.is_some());
        } else {
            assert_eq!((w.sent, w.failed), (250, 0));
            assert!(w.connect_error.is_none());
        }
    }
}

#[tokio::test]
async fn publish_failures_are_counted_and_skipped() {
    let connector = Arc::new(RecordingConnector {
        fail_every: Some(10),
        ..RecordingConnector::default()
    });
    let result = run(
        LoadConfig::new(103, 2, 1),
        connector,
        Arc::new(StopSignal::new()),
    )
    .await;

    // Shares 51 and 52: 5 failures each.
    assert_eq!(result.total_failed, 10);
    assert_eq!(result.total_sent, 93);
    assert_eq!(result.total_sent + result.total_failed, 103);
    assert_eq!(result.unsent(), 0);
}

#[tokio::test]
async fn sent_plus_failed_matches_total_for_uneven_splits() {
    for (total, workers, destinations) in [(1u64, 1u64, 1u64), (7, 3, 2), (1003, 4, 20), (5, 8, 3)] {
        let connector = Arc::new(DiscardConnector::default());
        let result = run(
            LoadConfig::new(total, workers, destinations),
            connector.clone(),
            Arc::new(StopSignal::new()),
        )
        .await;

        assert_eq!(result.total_sent + result.total_failed, total);
        assert_eq!(connector.published_total(), total);
        assert_eq!(result.workers.len() as u64, workers);
        assert_eq!(
            result.workers.last().map(|w| w.share),
            Some(total / workers + total % workers)
        );
    }
}

#[tokio::test]
async fn invalid_config_is_rejected_before_connecting() {
    let connector = Arc::new(RecordingConnector::default());
    let err = run_load(
        &LoadConfig::new(100, 0, 1),
        &BrokerConfig::default(),
        connector.clone(),
        Arc::new(RunStats::default()),
        Arc::new(StopSignal::new()),
    )
    .await;

    assert!(matches!(err, Err(Error::InvalidWorkers)));
    assert_eq!(connector.connects.load(Ordering::Relaxed), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_keeps_partial_counts() {
    let connector = Arc::new(RecordingConnector {
        publish_delay: Some(Duration::from_millis(5)),
        ..RecordingConnector::default()
    });
    let cancel = Arc::new(StopSignal::new());

    let stopper = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.stop();
        })
    };

    let result = run(LoadConfig::new(10_000, 2, 2), connector, cancel).await;
    let _ = stopper.await;

    assert!(result.cancelled);
    assert!(result.total_sent > 0);
    assert!(result.total_sent < 10_000);
    assert_eq!(result.total_failed, 0);
    assert_eq!(result.unsent(), 10_000 - result.total_sent);
    assert!(result.throughput > 0.0);
}
