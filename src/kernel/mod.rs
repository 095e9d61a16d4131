pub mod driver;
pub mod long_term_scheduler;
pub mod memory;
pub mod process_control_block;
pub mod resources;
pub mod short_term_scheduler;

pub use driver::{Driver, RunSummary, StatusReport, TickReport};
pub use long_term_scheduler::{LoadReport, LongTermScheduler};
pub use memory::{MemoryAllocator, MemoryBlock};
pub use process_control_block::{Bucket, Pid, Priority, Process, ProcessHandle, ProcessRecord};
pub use resources::{ResourceKind, ResourcePool, ResourceUnit, UnitId};
pub use short_term_scheduler::{AgingPolicy, Scheduler};
