//! One-shot listing of every object a [`Selector`] matches.
//!
//! Namespaced kinds are listed once per namespace: the selector's own
//! namespaces when it names any, otherwise every namespace from the cache.
//! Cluster-scoped kinds are listed once. Namespaces in `excludes` are
//! skipped, and the selector's labels narrow every listing.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use super::NamespaceCache;
use super::NamespaceLister;
use super::NamespaceSelector;
use super::Selector;
use crate::ResourceError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

/// A single list call against the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub api_version: String,
    pub kind: String,
    /// `None` lists across the cluster
    pub namespace: Option<String>,
    /// Rendered `k=v,...` selector; empty matches everything
    pub label_selector: String,
}

impl fmt::Display for ListRequest {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "namespace {namespace}"),
            None => f.write_str("cluster scope"),
        }
    }
}

/// Resolves kinds and lists objects on behalf of [`ResourceQuery`]
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceLister<O: Send + Sync + 'static>: Send + Sync + 'static {
    /// Scope of the kind named by `selector`
    async fn scope(
        &self,
        selector: &Selector,
    ) -> Result<ResourceScope>;

    async fn list(
        &self,
        request: &ListRequest,
    ) -> Result<Vec<O>>;
}

pub struct ResourceQuery<O, R, N> {
    lister: R,
    namespaces: NamespaceCache<N>,
    _objects: PhantomData<fn() -> O>,
}

impl<O, R, N> ResourceQuery<O, R, N>
where
    O: Send + Sync + 'static,
    R: ResourceLister<O>,
    N: NamespaceLister,
{
    pub fn new(
        lister: R,
        namespaces: NamespaceCache<N>,
    ) -> Self {
        Self {
            lister,
            namespaces,
            _objects: PhantomData,
        }
    }

    pub fn namespace_cache(&self) -> &NamespaceCache<N> {
        &self.namespaces
    }

    /// Every object matching `selector`, aggregated in namespace order.
    /// The first failing listing aborts the query.
    pub async fn query(
        &self,
        selector: &Selector,
    ) -> Result<Vec<O>> {
        let scope = self.lister.scope(selector).await.map_err(|e| ResourceError::UnknownKind {
            api_version: selector.api_version.clone(),
            kind: selector.kind.clone(),
            reason: e.to_string(),
        })?;

        let namespaces: Vec<Option<String>> = match scope {
            ResourceScope::Namespaced => {
                let excluded = NamespaceSelector {
                    include: Vec::new(),
                    exclude: selector.excludes.clone(),
                };
                let candidates = self.namespaces.namespaces(selector).await?;
                excluded.filter(&candidates).into_iter().map(Some).collect()
            }
            ResourceScope::Cluster => vec![None],
        };

        let label_selector = selector.label_selector();
        let mut output = Vec::new();
        for namespace in namespaces {
            let request = ListRequest {
                api_version: selector.api_version.clone(),
                kind: selector.kind.clone(),
                namespace,
                label_selector: label_selector.clone(),
            };
            let objects = self.lister.list(&request).await.map_err(|e| ResourceError::ListFailed {
                kind: selector.kind.clone(),
                scope: request.to_string(),
                reason: e.to_string(),
            })?;
            debug!("listed {} {} in {}", objects.len(), selector.kind, request);
            output.extend(objects);
        }
        Ok(output)
    }
}
