//! Watch subsystem: observes a resource collection through a [`ListWatcher`],
//! keeps a keyed local snapshot of it, and notifies registered sinks with
//! the key of every created, updated or deleted object.

mod informer;
mod key;
mod store;

pub use informer::*;
pub use key::*;
pub use store::*;
