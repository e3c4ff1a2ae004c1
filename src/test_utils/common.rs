use std::sync::Arc;
use std::time::Duration;

use crate::meta_namespace_key;
use crate::ControllerConfig;
use crate::KeyedSnapshot;
use crate::ObjectMeta;
use crate::ResourceId;
use crate::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestObject {
    pub namespace: Option<String>,
    pub name: String,
    pub value: u32,
}

impl TestObject {
    pub(crate) fn new(
        namespace: &str,
        name: &str,
    ) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
            value: 0,
        }
    }

    pub(crate) fn cluster_scoped(name: &str) -> Self {
        Self {
            namespace: None,
            name: name.to_string(),
            value: 0,
        }
    }

    pub(crate) fn with_value(
        mut self,
        value: u32,
    ) -> Self {
        self.value = value;
        self
    }

    pub(crate) fn key(&self) -> String {
        meta_namespace_key(self).unwrap()
    }
}

impl ObjectMeta for TestObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Store pre-populated with `objects`, keyed the way the informer keys them
pub(crate) fn store_with(objects: &[TestObject]) -> Arc<Store<TestObject>> {
    let store = Arc::new(Store::new());
    for obj in objects {
        store.insert(obj.key(), obj.clone());
    }
    store
}

pub(crate) fn as_snapshot(store: Arc<Store<TestObject>>) -> Arc<dyn KeyedSnapshot<TestObject>> {
    store
}

pub(crate) fn pods_config(max_batch: usize) -> ControllerConfig {
    ControllerConfig {
        resource: ResourceId::new("", "v1", "pods"),
        max_batch,
        worker_idle_period_ms: 10,
        ..Default::default()
    }
}

/// Polls `condition` every few milliseconds until it holds or `limit` elapses
pub(crate) async fn wait_until<F>(
    limit: Duration,
    condition: F,
) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
