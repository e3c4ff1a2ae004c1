use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batch_controller::Controller;
use batch_controller::ControllerConfig;
use batch_controller::ControllerState;
use batch_controller::Error;
use batch_controller::EventHandler;
use batch_controller::ListWatcher;
use batch_controller::ObjectMeta;
use batch_controller::OperationKind;
use batch_controller::ResourceId;
use batch_controller::Result;
use batch_controller::WatchEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    pub generation: u64,
}

impl Pod {
    pub fn new(
        namespace: &str,
        name: &str,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            generation: 1,
        }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl ObjectMeta for Pod {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        Some(&self.namespace)
    }
}

/// In-memory pod source; watch events are pushed through the returned sender
pub struct PodSource {
    pods: Vec<Pod>,
    events: Mutex<Option<mpsc::Receiver<WatchEvent<Pod>>>>,
}

impl PodSource {
    pub fn new(pods: Vec<Pod>) -> (Self, mpsc::Sender<WatchEvent<Pod>>) {
        let (tx, rx) = mpsc::channel(1024);
        let source = Self {
            pods,
            events: Mutex::new(Some(rx)),
        };
        (source, tx)
    }
}

#[async_trait]
impl ListWatcher<Pod> for PodSource {
    async fn list(&self) -> Result<Vec<Pod>> {
        Ok(self.pods.clone())
    }

    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent<Pod>>> {
        self.events
            .lock()
            .take()
            .ok_or_else(|| Error::Fatal("pod watch already consumed".to_string()))
    }
}

/// Records every batch it receives, optionally holding each call for `delay`
#[derive(Clone, Default)]
pub struct CollectingHandler {
    batches: Arc<Mutex<Vec<(OperationKind, Vec<String>)>>>,
    delay: Duration,
}

impl CollectingHandler {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<(OperationKind, Vec<String>)> {
        self.batches.lock().clone()
    }

    pub fn delivered_keys(
        &self,
        kind: OperationKind,
    ) -> Vec<String> {
        self.batches
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .flat_map(|(_, keys)| keys.clone())
            .collect()
    }

    pub fn distinct_keys(
        &self,
        kind: OperationKind,
    ) -> HashSet<String> {
        self.delivered_keys(kind).into_iter().collect()
    }

    async fn record(
        &self,
        kind: OperationKind,
        items: Vec<Pod>,
    ) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let keys = items.iter().map(Pod::key).collect();
        self.batches.lock().push((kind, keys));
    }
}

#[async_trait]
impl EventHandler<Pod> for CollectingHandler {
    async fn on_add(
        &self,
        items: Vec<Pod>,
    ) {
        self.record(OperationKind::Create, items).await;
    }

    async fn on_update(
        &self,
        items: Vec<Pod>,
    ) {
        self.record(OperationKind::Update, items).await;
    }

    async fn on_delete(
        &self,
        items: Vec<Pod>,
    ) {
        self.record(OperationKind::Delete, items).await;
    }
}

pub fn pods_config(
    max_batch: usize,
    workers: usize,
) -> ControllerConfig {
    ControllerConfig {
        resource: ResourceId::new("", "v1", "pods"),
        max_batch,
        workers,
        worker_idle_period_ms: 10,
        sync_timeout_ms: 5_000,
        ..Default::default()
    }
}

pub fn spawn_controller(
    controller: &Arc<Controller<Pod, PodSource>>,
    workers: usize,
    stop: &CancellationToken,
) -> JoinHandle<Result<()>> {
    let controller = controller.clone();
    let stop = stop.clone();
    tokio::spawn(async move { controller.start(workers, stop).await })
}

pub async fn wait_until<F>(condition: F) -> bool
where F: Fn() -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub async fn wait_for_running(controller: &Controller<Pod, PodSource>) {
    assert!(
        wait_until(|| controller.state() == ControllerState::Running).await,
        "controller stuck in {:?}",
        controller.state()
    );
}
