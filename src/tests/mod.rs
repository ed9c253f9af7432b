mod engine_test;
mod scan_test;

use std::sync::Arc;

use crate::{
    buffer::buffer_pool_manager::BufferPoolManager,
    storage::{
        disk::{DiskManager, MemoryDiskManager},
        page::page::page_constants::PAGE_SIZE,
        record::{file_handle::RmFileHandle, rm_defs::RmFileHdr},
    },
};

/// An empty record file on an in-memory disk, opened through a fresh pool.
pub(crate) fn memory_record_file(
    pool_size: usize,
    record_size: usize,
) -> (Arc<MemoryDiskManager>, RmFileHandle) {
    let disk = Arc::new(MemoryDiskManager::new());
    let file_id = disk.register_file("records.db");

    let hdr_page = disk.allocate_page(file_id).unwrap();
    let mut buf = vec![0u8; PAGE_SIZE];
    RmFileHdr::new(record_size).unwrap().encode(&mut buf);
    disk.write_page(file_id, hdr_page, &buf).unwrap();

    let bpm = Arc::new(BufferPoolManager::new(pool_size, disk.clone()));
    let file_handle = RmFileHandle::open(file_id, bpm).unwrap();

    (disk, file_handle)
}

/// A record whose every byte is `fill`.
pub(crate) fn record_of(record_size: usize, fill: u8) -> Vec<u8> {
    vec![fill; record_size]
}
