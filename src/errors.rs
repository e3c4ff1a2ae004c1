//! Batch Controller Error Hierarchy
//!
//! Startup faults (configuration, watch connection, cache sync) are surfaced
//! to the caller of `Controller::start`. Per-item faults inside a dispatch
//! cycle are logged and never travel through this type.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Watch source connection and cache synchronization failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Keyed snapshot lookups and key derivation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Resource coordinates, selectors and namespace discovery
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Unrecoverable lifecycle misuse
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchError {
    /// Initial list or re-list against the watch source failed
    #[error("[{id}] list failed: {reason}")]
    ListFailed { id: String, reason: String },

    /// Watch stream could not be established
    #[error("[{id}] watch failed: {reason}")]
    WatchFailed { id: String, reason: String },

    /// Cache did not report synchronized in time
    #[error("[{id}] timed out waiting for caches to sync after {timeout:?}")]
    SyncTimeout { id: String, timeout: Duration },

    /// Shutdown fired while waiting for the cache to sync
    #[error("[{id}] cache sync cancelled by shutdown signal")]
    SyncCancelled { id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Lookup failure distinct from a missing key
    #[error("lookup of key {key} failed: {reason}")]
    Lookup { key: String, reason: String },

    /// Object or tombstone from which no key can be derived
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// `apiVersion` is not `version` or `group/version`
    #[error("invalid group version: {0:?}")]
    InvalidGroupVersion(String),

    /// Namespace enumeration against the source failed
    #[error("failed to list namespaces: {0}")]
    NamespaceList(String),

    /// `apiVersion` and `kind` do not name a listable resource
    #[error("no resource mapping for kind {kind:?} in {api_version:?}: {reason}; use an apiVersion and kind listed by `kubectl api-resources --verbs=\"get,list\"`")]
    UnknownKind {
        api_version: String,
        kind: String,
        reason: String,
    },

    /// Listing one namespace (or the whole cluster) failed
    #[error("failed to list {kind} in {scope}: {reason}")]
    ListFailed {
        kind: String,
        scope: String,
        reason: String,
    },
}
