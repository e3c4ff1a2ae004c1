//! Batching event dispatcher for resource controllers.
//!
//! A [`Controller`] watches one resource collection through a
//! [`ListWatcher`], keeps a keyed local snapshot of it, and turns every
//! observed change into a [`Marker`] on a shared de-duplicating
//! [`WorkQueue`]. A pool of workers drains that queue in batches of a single
//! [`OperationKind`], resolves each key against the snapshot, and hands the
//! resolved objects to an [`EventHandler`].
//!
//! ## Example
//! ```rust,ignore
//! let config = ControllerConfig::load(None)?;
//! let controller = Controller::new(&config, source)?.with_handler(MyHandler);
//!
//! let stop = CancellationToken::new();
//! controller.start(config.workers, stop.clone()).await?;
//! ```

mod config;
mod constants;
mod controller;
mod errors;
mod queue;
mod resource;
mod utils;
mod watch;

pub use config::*;
pub use controller::*;
pub use errors::*;
pub use queue::*;
pub use resource::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
mod test_utils;
