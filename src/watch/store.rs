use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Read side of the local snapshot, as seen by dispatchers.
///
/// `Ok(None)` means the key is unknown; `Err` is reserved for lookups that
/// could not be answered at all.
#[cfg_attr(test, automock)]
pub trait KeyedSnapshot<O: Send + Sync + 'static>: Send + Sync + 'static {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<O>>;
}

/// Concurrent `key -> object` map maintained by the informer
pub struct Store<O> {
    items: DashMap<String, O>,
}

impl<O> Default for Store<O> {
    fn default() -> Self {
        Self { items: DashMap::new() }
    }
}

impl<O> Store<O>
where O: Clone + Send + Sync + 'static
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object previously stored under `key`
    pub fn insert(
        &self,
        key: String,
        obj: O,
    ) -> Option<O> {
        self.items.insert(key, obj)
    }

    pub fn remove(
        &self,
        key: &str,
    ) -> Option<O> {
        self.items.remove(key).map(|(_, obj)| obj)
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.items.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<O> KeyedSnapshot<O> for Store<O>
where O: Clone + Send + Sync + 'static
{
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<O>> {
        Ok(self.items.get(key).map(|entry| entry.value().clone()))
    }
}
