//! Ordered, de-duplicating work queue shared by producers (watch callbacks)
//! and consumers (dispatcher workers).

mod work_queue;
pub use work_queue::*;
