use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::warn;
use tracing::Instrument;

use crate::BackoffPolicy;
use crate::Result;

/// Retries `task` with exponential backoff until it succeeds or `policy`
/// runs out of attempts.
///
/// Returns `None` if `stop` fires first; otherwise the first success or the
/// last error.
pub(crate) async fn task_with_exponential_backoff<F, T, P, E>(
    name: &str,
    task: F,
    policy: &BackoffPolicy,
    stop: &CancellationToken,
) -> Option<std::result::Result<P, E>>
where
    F: Fn() -> T,
    T: Future<Output = std::result::Result<P, E>>,
    E: Display,
{
    let mut retries = 0;
    let mut delay = policy.base_delay();
    loop {
        let result = tokio::select! {
            _ = stop.cancelled() => return None,
            result = task() => result,
        };
        let e = match result {
            Ok(r) => return Some(Ok(r)),
            Err(e) => e,
        };

        retries += 1;
        if policy.exhausted(retries) {
            warn!("[{name}] task failed after {} retries: {}", retries, e);
            return Some(Err(e));
        }
        warn!("[{name}] attempt {} failed, retrying in {:?}: {}", retries, delay, e);

        tokio::select! {
            _ = stop.cancelled() => return None,
            _ = sleep(delay) => {}
        }
        delay = policy.next_delay(delay);
    }
}

/// Re-runs `task` until `stop` fires, pausing `period` after each return.
///
/// The pause is skipped as soon as `stop` fires, so shutdown latency is
/// bounded by the running task rather than by `period`.
pub(crate) async fn run_until<F, Fut>(
    task: F,
    period: Duration,
    stop: CancellationToken,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        if stop.is_cancelled() {
            return;
        }
        task().await;

        tokio::select! {
            _ = stop.cancelled() => return,
            _ = sleep(period) => {}
        }
    }
}

// Helper function to spawn tasks and track their JoinHandles
pub(crate) fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<JoinHandle<()>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    // Clone the name so it can be safely moved into the async block
    let name = name.to_string();
    let handle = tokio::spawn(
        async move {
            if let Err(e) = task_fn().await {
                error!("spawned task: {name} stopped or encountered an error: {:?}", e);
            }
        }
        .in_current_span(),
    );

    // Push the handle into the vector inside the Option
    if let Some(h) = handles {
        h.push(handle);
    }
}
