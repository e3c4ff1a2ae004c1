use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::Error;
use crate::ListWatcher;
use crate::Result;
use crate::WatchEvent;

pub(crate) enum ListBehavior<O> {
    Items(Vec<O>),
    Fail(String),
    Hang,
}

/// Scripted watch source. Listings are consumed in order and the last one
/// repeats; every `watch` call hands out the next stream, whose events are
/// pushed by the test through the matching sender.
pub(crate) struct FakeListWatcher<O> {
    lists: Mutex<VecDeque<ListBehavior<O>>>,
    streams: Mutex<VecDeque<mpsc::Receiver<WatchEvent<O>>>>,
}

impl<O> FakeListWatcher<O> {
    pub(crate) fn new(items: Vec<O>) -> (Self, mpsc::Sender<WatchEvent<O>>) {
        let (source, mut senders) = Self::scripted(vec![ListBehavior::Items(items)], 1);
        (source, senders.remove(0))
    }

    /// `streams` watch streams are available, one per successful re-list
    pub(crate) fn scripted(
        lists: Vec<ListBehavior<O>>,
        streams: usize,
    ) -> (Self, Vec<mpsc::Sender<WatchEvent<O>>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) = (0..streams).map(|_| mpsc::channel(128)).unzip();
        let source = Self {
            lists: Mutex::new(lists.into()),
            streams: Mutex::new(receivers),
        };
        (source, senders)
    }

    pub(crate) fn failing_list(reason: &str) -> Self {
        Self::scripted(vec![ListBehavior::Fail(reason.to_string())], 0).0
    }

    /// Listing succeeds but no watch stream can be opened
    pub(crate) fn failing_watch(items: Vec<O>) -> Self {
        Self::scripted(vec![ListBehavior::Items(items)], 0).0
    }

    /// Listing never completes
    pub(crate) fn hanging() -> Self {
        Self::scripted(vec![ListBehavior::Hang], 0).0
    }
}

#[async_trait]
impl<O> ListWatcher<O> for FakeListWatcher<O>
where O: Clone + Send + Sync + 'static
{
    async fn list(&self) -> Result<Vec<O>> {
        let next = {
            let mut lists = self.lists.lock();
            if lists.len() > 1 {
                lists.pop_front()
            } else {
                match lists.front() {
                    Some(ListBehavior::Items(items)) => Some(ListBehavior::Items(items.clone())),
                    Some(ListBehavior::Fail(reason)) => Some(ListBehavior::Fail(reason.clone())),
                    Some(ListBehavior::Hang) => Some(ListBehavior::Hang),
                    None => None,
                }
            }
        };
        match next {
            Some(ListBehavior::Items(items)) => Ok(items),
            Some(ListBehavior::Fail(reason)) => Err(Error::Fatal(reason)),
            Some(ListBehavior::Hang) | None => std::future::pending().await,
        }
    }

    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent<O>>> {
        self.streams
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Fatal("watch stream unavailable".to_string()))
    }
}
