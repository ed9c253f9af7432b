pub mod manager;
pub mod memory;

pub use manager::{DiskManager, FileDiskManager};
pub use memory::MemoryDiskManager;
