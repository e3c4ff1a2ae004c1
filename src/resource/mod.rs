//! Resource coordinates, selectors and namespace discovery.
//!
//! These are the query-building helpers a controller is configured with,
//! plus [`ResourceQuery`] for one-shot listings outside the watch. Nothing
//! here talks to a cluster directly: namespace enumeration goes through the
//! [`NamespaceLister`] seam and listing through [`ResourceLister`].

mod namespace_cache;
mod query;
mod selector;

pub use namespace_cache::*;
pub use query::*;
pub use selector::*;
