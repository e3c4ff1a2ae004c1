//! FIFO work queue with pending-item de-duplication and per-key exclusivity.
//!
//! ## Bookkeeping
//! - `queue`: items ready to be handed out, in arrival order
//! - `dirty`: every item that still needs processing (queued or parked)
//! - `processing`: keys currently held by a consumer between `get` and `done`
//! - `parked`: items whose key was busy when they arrived or surfaced; they
//!   return to the tail of `queue` when the key is released
//!
//! Adding an item that is already dirty is a no-op. After `shut_down`, new
//! items are dropped while already dirty ones still drain, and `get` reports
//! shutdown once nothing is left to hand out.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::hash::Hash;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

/// An item the queue can de-duplicate and serialize by key
pub trait QueueItem: Clone + Eq + Hash + Send + 'static {
    type Key: Clone + Eq + Hash + Send + 'static;

    /// Items sharing a key are never held by two consumers at once
    fn key(&self) -> Self::Key;
}

struct QueueState<T: QueueItem> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T::Key>,
    parked: HashMap<T::Key, VecDeque<T>>,
    shutting_down: bool,
}

pub struct WorkQueue<T: QueueItem> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

impl<T: QueueItem> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: QueueItem> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                parked: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Marks `item` as needing processing. Merges with an identical pending
    /// item; parks it if its key is currently being processed.
    ///
    /// Returns `false` when the item was dropped because the queue is shutting
    /// down.
    pub fn add(
        &self,
        item: T,
    ) -> bool {
        {
            let mut state = self.state.lock();
            if state.shutting_down {
                return false;
            }
            if state.dirty.contains(&item) {
                return true;
            }
            state.dirty.insert(item.clone());

            let key = item.key();
            if state.processing.contains(&key) {
                state.parked.entry(key).or_default().push_back(item);
                return true;
            }
            state.queue.push_back(item);
        }
        self.notify.notify_one();
        true
    }

    /// Waits for the next item whose key is free.
    ///
    /// Returns `None` once the queue is shut down and fully drained. Every
    /// returned item must be released with [`WorkQueue::done`].
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent add or
            // shut_down cannot slip between the check and the wait.
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(item) = state.pop_ready() {
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Non-blocking [`WorkQueue::get`]: `None` when no item is ready right now,
    /// whether or not the queue is shutting down
    pub fn try_get(&self) -> Option<T> {
        self.state.lock().pop_ready()
    }

    /// Releases the key held by `item`, re-queueing anything parked on it
    pub fn done(
        &self,
        item: &T,
    ) {
        let released = {
            let mut state = self.state.lock();
            let key = item.key();
            state.processing.remove(&key);
            match state.parked.remove(&key) {
                Some(parked) => {
                    let count = parked.len();
                    state.queue.extend(parked);
                    count
                }
                None => 0,
            }
        };

        for _ in 0..released {
            self.notify.notify_one();
        }
    }

    /// Items ready to be handed out; parked and in-flight items are excluded
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops accepting new items and wakes every waiting consumer.
    /// Safe to call repeatedly.
    pub fn shut_down(&self) {
        {
            let mut state = self.state.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
        }
        trace!("work queue shutting down");
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }
}

impl<T: QueueItem> QueueState<T> {
    fn pop_ready(&mut self) -> Option<T> {
        while let Some(item) = self.queue.pop_front() {
            let key = item.key();
            if self.processing.contains(&key) {
                self.parked.entry(key).or_default().push_back(item);
                continue;
            }
            self.dirty.remove(&item);
            self.processing.insert(key);
            return Some(item);
        }
        None
    }
}
