//! Helpers shared by the unit tests: logger setup, fast timing
//! configuration, a running link and mock transport wiring.
mod mock;

pub use common::*;
pub use mock::*;
