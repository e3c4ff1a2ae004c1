use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::EventSink;
use crate::QueueItem;
use crate::WorkQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// "This key changed, in this way". The object itself is looked up in the
/// snapshot when the marker is processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    pub key: String,
    pub kind: OperationKind,
}

impl Marker {
    pub fn new(
        key: impl Into<String>,
        kind: OperationKind,
    ) -> Self {
        Self { key: key.into(), kind }
    }

    pub fn create(key: impl Into<String>) -> Self {
        Self::new(key, OperationKind::Create)
    }

    pub fn update(key: impl Into<String>) -> Self {
        Self::new(key, OperationKind::Update)
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::new(key, OperationKind::Delete)
    }
}

impl QueueItem for Marker {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.key.clone()
    }
}

/// Informer sink that turns notifications into queued markers
pub(crate) struct QueueSink {
    queue: Arc<WorkQueue<Marker>>,
}

impl QueueSink {
    pub(crate) fn new(queue: Arc<WorkQueue<Marker>>) -> Self {
        Self { queue }
    }

    fn enqueue(
        &self,
        marker: Marker,
    ) {
        debug!("Queuing event: {:?}", marker);
        self.queue.add(marker);
    }
}

impl EventSink for QueueSink {
    fn on_create(
        &self,
        key: &str,
    ) {
        self.enqueue(Marker::create(key));
    }

    fn on_update(
        &self,
        key: &str,
    ) {
        self.enqueue(Marker::update(key));
    }

    fn on_delete(
        &self,
        key: &str,
    ) {
        self.enqueue(Marker::delete(key));
    }
}
