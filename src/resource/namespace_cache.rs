use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::Mutex;
use tracing::debug;

use super::Selector;
use crate::Result;

/// Enumerates every namespace known to the watch source
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NamespaceLister: Send + Sync + 'static {
    async fn list_namespaces(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Populated(Vec<String>),
}

/// Per-client cache of the full namespace list.
///
/// The lister is consulted at most once while the cache is populated; a
/// failed listing leaves the cache empty so the next call retries.
pub struct NamespaceCache<L> {
    lister: L,
    state: Mutex<CacheState>,
}

impl<L> NamespaceCache<L>
where L: NamespaceLister
{
    pub fn new(lister: L) -> Self {
        Self {
            lister,
            state: Mutex::new(CacheState::Empty),
        }
    }

    /// Namespaces a selector applies to. An explicit list on the selector
    /// bypasses the cache entirely.
    pub async fn namespaces(
        &self,
        selector: &Selector,
    ) -> Result<Vec<String>> {
        if !selector.namespaces.is_empty() {
            return Ok(selector.namespaces.clone());
        }
        self.all_namespaces().await
    }

    pub async fn all_namespaces(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        if let CacheState::Populated(namespaces) = &*state {
            return Ok(namespaces.clone());
        }

        let namespaces = self.lister.list_namespaces().await?;
        debug!("namespace cache populated with {} entries", namespaces.len());
        *state = CacheState::Populated(namespaces.clone());
        Ok(namespaces)
    }

    pub async fn state(&self) -> CacheState {
        self.state.lock().await.clone()
    }

    /// Drops the cached list; the next lookup lists again
    pub async fn invalidate(&self) {
        *self.state.lock().await = CacheState::Empty;
    }
}
