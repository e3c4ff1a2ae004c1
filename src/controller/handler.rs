use async_trait::async_trait;

/// Receives resolved batches, one method per operation kind.
///
/// Every method defaults to a no-op, so implementors only override the kinds
/// they care about. Batches may be empty. With more than one worker the
/// methods can run concurrently.
#[async_trait]
pub trait EventHandler<O: Send + 'static>: Send + Sync + 'static {
    async fn on_add(
        &self,
        _items: Vec<O>,
    ) {
    }

    async fn on_update(
        &self,
        _items: Vec<O>,
    ) {
    }

    async fn on_delete(
        &self,
        _items: Vec<O>,
    ) {
    }
}

/// Handler installed until the caller provides one
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl<O: Send + 'static> EventHandler<O> for NoopHandler {}
