//! Batch controller: turns watch notifications into change markers, drains
//! them from the shared work queue in same-kind batches, and hands each
//! batch to the caller's [`EventHandler`].

mod controller;
mod dispatcher;
mod handler;
mod marker;

pub use controller::*;
pub use dispatcher::*;
pub use handler::*;
pub use marker::*;
