//! List-then-watch informer.
//!
//! ## Lifecycle
//! 1. `run` lists the source, opens the watch stream, and replays every
//!    listed object into the store as a create notification
//! 2. The informer reports synced; `wait_for_sync` callers are released
//! 3. Watch events keep the store current and fan out to every sink
//! 4. With a non-zero resync interval, every stored key is periodically
//!    re-delivered as an update
//! 5. When the watch stream closes, the source is listed again under the
//!    retry policy and a new stream is opened. The listing is reconciled
//!    against the store: unknown keys are created, known keys updated and
//!    keys missing from the listing deleted
//!
//! A failed initial list or watch is recorded so that `wait_for_sync`
//! surfaces it to the caller instead of waiting forever. A re-list that
//! exhausts the retry policy is recorded the same way and reported by
//! `wait_for_failure`.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::interval_at;
use tokio::time::sleep;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::deletion_handling_key;
use super::meta_namespace_key;
use super::Deleted;
use super::ObjectMeta;
use super::Store;
use crate::utils::async_task::task_with_exponential_backoff;
use crate::BackoffPolicy;
use crate::Error;
use crate::Result;
use crate::WatchError;

/// Raw notification delivered by a watch stream
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<O> {
    Added(O),
    Modified(O),
    Deleted(Deleted<O>),
}

/// Source of truth for one resource collection
#[async_trait]
pub trait ListWatcher<O: Send + 'static>: Send + Sync + 'static {
    /// Full listing used to seed the local snapshot
    async fn list(&self) -> Result<Vec<O>>;

    /// Incremental changes following the listing
    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent<O>>>;
}

/// Receives the key of every observed change
pub trait EventSink: Send + Sync + 'static {
    fn on_create(
        &self,
        key: &str,
    );

    fn on_update(
        &self,
        key: &str,
    );

    fn on_delete(
        &self,
        key: &str,
    );
}

#[derive(Debug, Clone)]
enum SyncState {
    Pending,
    Synced,
    Failed(WatchError),
}

pub struct Informer<O, L> {
    id: String,
    source: L,
    store: Arc<Store<O>>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    resync_interval: Duration,
    retry: BackoffPolicy,
    sync_state: watch::Sender<SyncState>,
    started: AtomicBool,
}

impl<O, L> Informer<O, L>
where
    O: ObjectMeta + Clone + Send + Sync + 'static,
    L: ListWatcher<O>,
{
    pub fn new(
        id: impl Into<String>,
        source: L,
        resync_interval: Duration,
    ) -> Self {
        let (sync_state, _) = watch::channel(SyncState::Pending);
        Self {
            id: id.into(),
            source,
            store: Arc::new(Store::new()),
            sinks: RwLock::new(Vec::new()),
            resync_interval,
            retry: BackoffPolicy::default(),
            sync_state,
            started: AtomicBool::new(false),
        }
    }

    pub fn with_retry(
        mut self,
        retry: BackoffPolicy,
    ) -> Self {
        self.retry = retry;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> Arc<Store<O>> {
        self.store.clone()
    }

    pub fn add_event_sink(
        &self,
        sink: Arc<dyn EventSink>,
    ) {
        self.sinks.write().push(sink);
    }

    pub fn has_synced(&self) -> bool {
        matches!(*self.sync_state.borrow(), SyncState::Synced)
    }

    /// Runs until `stop` fires, or until re-listing a closed watch stream
    /// exhausts the retry policy. May only be called once.
    pub async fn run(
        &self,
        stop: CancellationToken,
    ) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Fatal(format!("[{}] informer already started", self.id)));
        }

        let listed = tokio::select! {
            _ = stop.cancelled() => {
                debug!("[{}] informer stopped before initial list completed", self.id);
                return Ok(());
            }
            result = self.list_and_watch() => result,
        };
        let mut events = match listed {
            Ok(events) => events,
            Err(e) => {
                self.sync_state.send_replace(SyncState::Failed(e.clone()));
                return Err(e.into());
            }
        };

        self.sync_state.send_replace(SyncState::Synced);
        debug!("[{}] informer synced with {} objects", self.id, self.store.len());

        let mut resync = self.resync_ticker();
        loop {
            if !self.watch_until_closed(&stop, &mut events, &mut resync).await {
                debug!("[{}] informer stopped", self.id);
                return Ok(());
            }
            warn!("[{}] watch stream closed, re-listing", self.id);

            tokio::select! {
                _ = stop.cancelled() => return Ok(()),
                _ = sleep(self.retry.base_delay()) => {}
            }
            events = match task_with_exponential_backoff(&self.id, || self.list_and_watch(), &self.retry, &stop).await {
                Some(Ok(events)) => events,
                Some(Err(e)) => {
                    error!("[{}] giving up on watch: {}", self.id, e);
                    self.sync_state.send_replace(SyncState::Failed(e.clone()));
                    return Err(e.into());
                }
                None => {
                    debug!("[{}] informer stopped while re-listing", self.id);
                    return Ok(());
                }
            };
        }
    }

    /// Applies events until the stream closes (`true`) or `stop` fires (`false`)
    async fn watch_until_closed(
        &self,
        stop: &CancellationToken,
        events: &mut mpsc::Receiver<WatchEvent<O>>,
        resync: &mut Option<Interval>,
    ) -> bool {
        loop {
            tokio::select! {
                _ = stop.cancelled() => return false,
                _ = next_resync(resync) => self.resync(),
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => return true,
                },
            }
        }
    }

    /// Resolves with the error that ended `run`, if it ever fails
    pub async fn wait_for_failure(&self) -> Error {
        let mut state_rx = self.sync_state.subscribe();
        loop {
            let state = state_rx.borrow_and_update().clone();
            if let SyncState::Failed(e) = state {
                return e.into();
            }
            if state_rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Resolves `Ok(true)` once synced and `Ok(false)` when `stop` fires or
    /// `timeout` elapses first. A failed initial list or watch is returned
    /// as an error.
    pub async fn wait_for_sync(
        &self,
        stop: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        let mut state_rx = self.sync_state.subscribe();
        let synced = async move {
            loop {
                let state = state_rx.borrow_and_update().clone();
                match state {
                    SyncState::Synced => return Ok(true),
                    SyncState::Failed(e) => return Err(Error::from(e)),
                    SyncState::Pending => {}
                }
                if state_rx.changed().await.is_err() {
                    return Ok(false);
                }
            }
        };
        let bounded = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, synced).await.unwrap_or(Ok(false)),
                None => synced.await,
            }
        };

        tokio::select! {
            biased;
            _ = stop.cancelled() => Ok(false),
            result = bounded => result,
        }
    }

    async fn list_and_watch(&self) -> std::result::Result<mpsc::Receiver<WatchEvent<O>>, WatchError> {
        let objects = self.source.list().await.map_err(|e| WatchError::ListFailed {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        let events = self.source.watch().await.map_err(|e| WatchError::WatchFailed {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;

        info!("[{}] listed {} objects", self.id, objects.len());
        self.replace(objects);
        Ok(events)
    }

    /// Reconciles the store with a full listing
    fn replace(
        &self,
        objects: Vec<O>,
    ) {
        let sinks = self.sinks();
        let mut listed = HashSet::with_capacity(objects.len());
        for obj in objects {
            let key = match meta_namespace_key(&obj) {
                Ok(key) => key,
                Err(e) => {
                    warn!("[{}] dropping listed object: {}", self.id, e);
                    continue;
                }
            };
            if self.store.insert(key.clone(), obj).is_some() {
                sinks.iter().for_each(|sink| sink.on_update(&key));
            } else {
                sinks.iter().for_each(|sink| sink.on_create(&key));
            }
            listed.insert(key);
        }

        for key in self.store.list_keys() {
            if !listed.contains(&key) && self.store.remove(&key).is_some() {
                sinks.iter().for_each(|sink| sink.on_delete(&key));
            }
        }
    }

    fn handle_event(
        &self,
        event: WatchEvent<O>,
    ) {
        match event {
            WatchEvent::Added(obj) => match meta_namespace_key(&obj) {
                Ok(key) => {
                    self.store.insert(key.clone(), obj);
                    self.sinks().iter().for_each(|sink| sink.on_create(&key));
                }
                Err(e) => warn!("[{}] dropping add notification: {}", self.id, e),
            },
            WatchEvent::Modified(obj) => match meta_namespace_key(&obj) {
                Ok(key) => {
                    self.store.insert(key.clone(), obj);
                    self.sinks().iter().for_each(|sink| sink.on_update(&key));
                }
                Err(e) => warn!("[{}] dropping update notification: {}", self.id, e),
            },
            WatchEvent::Deleted(deleted) => match deletion_handling_key(&deleted) {
                Ok(key) => {
                    self.store.remove(&key);
                    self.sinks().iter().for_each(|sink| sink.on_delete(&key));
                }
                Err(e) => warn!("[{}] dropping delete notification: {}", self.id, e),
            },
        }
    }

    fn resync(&self) {
        let keys = self.store.list_keys();
        trace!("[{}] resync re-delivering {} keys", self.id, keys.len());
        let sinks = self.sinks();
        for key in &keys {
            sinks.iter().for_each(|sink| sink.on_update(key));
        }
    }

    fn sinks(&self) -> Vec<Arc<dyn EventSink>> {
        self.sinks.read().clone()
    }

    fn resync_ticker(&self) -> Option<Interval> {
        if self.resync_interval.is_zero() {
            return None;
        }
        let mut ticker = interval_at(Instant::now() + self.resync_interval, self.resync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }
}

async fn next_resync(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
