//! Same-kind batch dispatch over the shared work queue.
//!
//! ## Cycle
//! 1. Bound the cycle by `min(queue.len(), max_batch)`, but always attempt at
//!    least one acquisition so an empty queue blocks instead of spinning.
//!    Only that first acquisition waits; later ones end the cycle early when
//!    the queue has nothing ready
//! 2. The first marker fixes the cycle's kind; later markers of another kind
//!    go back to the queue and still count toward the bound
//! 3. Each matching marker is resolved against the snapshot. A lookup error
//!    or a missing key ends the cycle and discards the partial batch
//! 4. The batch, possibly empty, goes to the handler method for the kind

use std::sync::Arc;

use tracing::trace;
use tracing::warn;

use super::EventHandler;
use super::Marker;
use super::OperationKind;
use crate::KeyedSnapshot;
use crate::WorkQueue;

pub struct Dispatcher<O: Send + Sync + 'static> {
    id: String,
    queue: Arc<WorkQueue<Marker>>,
    snapshot: Arc<dyn KeyedSnapshot<O>>,
    handler: Arc<dyn EventHandler<O>>,
    max_batch: usize,
}

impl<O> Dispatcher<O>
where O: Send + Sync + 'static
{
    pub fn new(
        id: impl Into<String>,
        queue: Arc<WorkQueue<Marker>>,
        snapshot: Arc<dyn KeyedSnapshot<O>>,
        handler: Arc<dyn EventHandler<O>>,
        max_batch: usize,
    ) -> Self {
        Self {
            id: id.into(),
            queue,
            snapshot,
            handler,
            max_batch: max_batch.max(1),
        }
    }

    /// Runs cycles until the queue reports shutdown
    pub async fn run(&self) {
        while self.process_one_cycle().await {}
        trace!("[{}] dispatcher loop finished", self.id);
    }

    /// Processes one batch. Returns `false` only when the queue is shut down.
    pub async fn process_one_cycle(&self) -> bool {
        let bound = self.batch_bound();
        let mut match_kind: Option<OperationKind> = None;
        let mut items = Vec::with_capacity(bound);

        for i in 0..bound {
            let marker = if i == 0 {
                match self.queue.get().await {
                    Some(marker) => marker,
                    None => return false,
                }
            } else {
                // other workers may have drained what the bound counted on
                match self.queue.try_get() {
                    Some(marker) => marker,
                    None => break,
                }
            };

            let kind = *match_kind.get_or_insert(marker.kind);
            if marker.kind != kind {
                if !self.queue.add(marker.clone()) {
                    trace!("[{}] queue shutting down, dropping requeued marker {:?}", self.id, marker);
                }
                self.queue.done(&marker);
                continue;
            }

            match self.snapshot.get(&marker.key) {
                Ok(Some(obj)) => {
                    self.queue.done(&marker);
                    items.push(obj);
                }
                Ok(None) => {
                    if kind != OperationKind::Delete {
                        warn!("[{}] object with key {} doesn't exist in cache", self.id, marker.key);
                    }
                    self.queue.done(&marker);
                    return true;
                }
                Err(e) => {
                    warn!(
                        "[{}] error fetching object with key {} from cache: {}",
                        self.id, marker.key, e
                    );
                    self.queue.done(&marker);
                    return true;
                }
            }
        }

        if let Some(kind) = match_kind {
            self.dispatch(kind, items).await;
        }
        true
    }

    fn batch_bound(&self) -> usize {
        self.queue.len().min(self.max_batch).max(1)
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        items: Vec<O>,
    ) {
        trace!("[{}] dispatching {} batch of {}", self.id, kind, items.len());
        match kind {
            OperationKind::Create => self.handler.on_add(items).await,
            OperationKind::Update => self.handler.on_update(items).await,
            OperationKind::Delete => self.handler.on_delete(items).await,
        }
    }
}
