pub mod iterator;
pub mod rm_scan;

pub use iterator::StorageIterator;
pub use rm_scan::RmScan;
