pub mod disk;
pub mod loader;
pub mod snapshot;
pub mod storage;

pub use disk::{BlockStore, DiskBlock};
pub use snapshot::{PathSnapshot, RunRecord};
pub use storage::{DirStorage, MemStorage, Storage};
