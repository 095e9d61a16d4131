//! Discrete-time simulator of a single machine's resource managers: a
//! multilevel feedback queue scheduler with aging, bucketed memory blocks,
//! a block-allocated file store and pools of peripheral units.

pub mod config;
pub mod error;
pub mod io;
pub mod kernel;

pub use config::Config;
pub use kernel::Driver;
