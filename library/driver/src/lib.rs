//! Driver bootstrap.
//!
//! Reads driver configuration from the process environment, builds the
//! process-wide [`DriverHandle`] exactly once regardless of how many
//! threads race into [`init`], and hands the residency tracker to the
//! submission paths through that handle.

pub mod driver;
pub mod env;

pub use self::driver::{init, try_get, DriverError, DriverHandle};
pub use self::env::DriverEnv;
