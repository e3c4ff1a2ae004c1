//! Worker pool and lifecycle for one watched resource collection.
//!
//! ## Key Responsibilities
//! - Starts the informer and waits for its initial cache sync
//! - Spawns the dispatcher workers sharing one work queue
//! - Blocks until the shutdown token fires, then shuts the queue down and
//!   waits for every worker to exit
//! - Shuts down the same way, but returns the error, when the informer gives
//!   up re-establishing its watch
//!
//! ## Example Usage
//! ```rust,ignore
//! let controller = Controller::new(&config, source)?.with_handler(MyHandler);
//! let stop = CancellationToken::new();
//! controller.start(config.workers, stop.clone()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::Dispatcher;
use super::EventHandler;
use super::Marker;
use super::NoopHandler;
use super::QueueSink;
use crate::utils::async_task::run_until;
use crate::utils::async_task::spawn_task;
use crate::ControllerConfig;
use crate::Error;
use crate::Informer;
use crate::ListWatcher;
use crate::ObjectMeta;
use crate::Result;
use crate::Store;
use crate::WatchError;
use crate::WorkQueue;

/// `Created → Syncing → Running → ShuttingDown → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Created,
    Syncing,
    Running,
    ShuttingDown,
    Stopped,
}

pub struct Controller<O, L>
where O: ObjectMeta + Clone + Send + Sync + 'static
{
    id: String,
    informer: Arc<Informer<O, L>>,
    queue: Arc<WorkQueue<Marker>>,
    handler: Arc<dyn EventHandler<O>>,
    max_batch: usize,
    worker_idle_period: Duration,
    sync_timeout: Option<Duration>,
    state: Mutex<ControllerState>,
}

impl<O, L> Controller<O, L>
where
    O: ObjectMeta + Clone + Send + Sync + 'static,
    L: ListWatcher<O>,
{
    /// Wires an informer over `source` to a fresh work queue. Handlers
    /// default to no-ops until [`Controller::with_handler`] is called.
    pub fn new(
        config: &ControllerConfig,
        source: L,
    ) -> Result<Self> {
        config.validate()?;

        let id = config.resource.controller_id();
        let queue = Arc::new(WorkQueue::new());
        let informer =
            Arc::new(Informer::new(id.clone(), source, config.resync_interval()).with_retry(config.watch_retry));
        informer.add_event_sink(Arc::new(QueueSink::new(queue.clone())));

        Ok(Self {
            id,
            informer,
            queue,
            handler: Arc::new(NoopHandler),
            max_batch: config.max_batch,
            worker_idle_period: config.worker_idle_period(),
            sync_timeout: config.sync_timeout(),
            state: Mutex::new(ControllerState::Created),
        })
    }

    pub fn with_handler(
        mut self,
        handler: impl EventHandler<O>,
    ) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    pub fn queue(&self) -> Arc<WorkQueue<Marker>> {
        self.queue.clone()
    }

    pub fn store(&self) -> Arc<Store<O>> {
        self.informer.store()
    }

    /// Runs the controller until `stop` fires.
    ///
    /// Fails without starting any worker when the informer cannot list or
    /// watch its source, when the cache does not sync within the configured
    /// timeout, or when `stop` fires first. Once running, fails after
    /// draining the queue if the informer exhausts its re-list retries.
    /// `workers` below 1 runs one worker.
    pub async fn start(
        &self,
        workers: usize,
        stop: CancellationToken,
    ) -> Result<()> {
        self.begin()?;

        let mut handles = Vec::new();
        let informer_stop = stop.child_token();

        // 1. Start the watch subsystem
        let informer = self.informer.clone();
        let token = informer_stop.clone();
        spawn_task(
            &format!("{}-informer", self.id),
            move || async move { informer.run(token).await },
            Some(&mut handles),
        );

        // 2. Wait for the initial cache sync
        if let Err(e) = self.wait_for_cache_sync(&stop).await {
            self.set_state(ControllerState::ShuttingDown);
            informer_stop.cancel();
            self.queue.shut_down();
            self.join(handles).await;
            self.set_state(ControllerState::Stopped);
            return Err(e);
        }

        // 3. Spawn workers
        self.set_state(ControllerState::Running);
        let workers_stop = stop.child_token();
        let dispatcher = Arc::new(Dispatcher::new(
            self.id.clone(),
            self.queue.clone(),
            self.informer.store(),
            self.handler.clone(),
            self.max_batch,
        ));
        for i in 0..workers.max(1) {
            info!("[{}] Creating worker #{}", self.id, i + 1);
            let dispatcher = dispatcher.clone();
            let stop = workers_stop.clone();
            let period = self.worker_idle_period;
            spawn_task(
                &format!("{}-worker-{}", self.id, i + 1),
                move || async move {
                    run_until(
                        || {
                            let dispatcher = dispatcher.clone();
                            async move { dispatcher.run().await }
                        },
                        period,
                        stop,
                    )
                    .await;
                    Ok(())
                },
                Some(&mut handles),
            );
        }

        // 4. Block until shutdown or a lost watch, then drain
        let outcome = tokio::select! {
            _ = stop.cancelled() => {
                info!("[{}] shutdown signal received, shutting down work queue", self.id);
                Ok(())
            }
            e = self.informer.wait_for_failure() => {
                error!("[{}] watch lost, shutting down work queue: {}", self.id, e);
                Err(e)
            }
        };
        self.set_state(ControllerState::ShuttingDown);
        informer_stop.cancel();
        workers_stop.cancel();
        self.queue.shut_down();
        self.join(handles).await;
        self.set_state(ControllerState::Stopped);
        info!("[{}] controller stopped", self.id);

        outcome
    }

    fn begin(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state != ControllerState::Created {
            return Err(Error::Fatal(format!(
                "[{}] controller cannot start from state {:?}",
                self.id, *state
            )));
        }
        *state = ControllerState::Syncing;
        Ok(())
    }

    fn set_state(
        &self,
        next: ControllerState,
    ) {
        let mut state = self.state.lock();
        debug!("[{}] {:?} -> {:?}", self.id, *state, next);
        *state = next;
    }

    async fn wait_for_cache_sync(
        &self,
        stop: &CancellationToken,
    ) -> Result<()> {
        match self.informer.wait_for_sync(stop, self.sync_timeout).await {
            Ok(true) => {
                info!("[{}] Informer is ready and synced", self.id);
                Ok(())
            }
            Ok(false) if stop.is_cancelled() => {
                error!("[{}] Shutdown requested while waiting for caches to sync", self.id);
                Err(WatchError::SyncCancelled { id: self.id.clone() }.into())
            }
            Ok(false) => {
                error!("[{}] Timed out waiting for caches to sync", self.id);
                Err(WatchError::SyncTimeout {
                    id: self.id.clone(),
                    timeout: self.sync_timeout.unwrap_or_default(),
                }
                .into())
            }
            Err(e) => {
                error!("[{}] Failed to sync caches: {}", self.id, e);
                Err(e)
            }
        }
    }

    async fn join(
        &self,
        handles: Vec<JoinHandle<()>>,
    ) {
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("[{}] background task failed: {:?}", self.id, e);
            }
        }
    }
}
