//! the test_utils folder here will share fixtures between the unit tests of
//! the queue, watch and controller modules
mod common;

pub use common::*;
pub use mock::*;
