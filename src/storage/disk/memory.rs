use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{ensure, Context, Result};
use parking_lot::Mutex;

use super::manager::{DiskManager, MAX_PAGES_PER_FILE};
use crate::storage::page::page::{page_constants::PAGE_SIZE, FileId, PageNo};

struct MemoryFile {
    name: String,
    pages: Vec<Box<[u8]>>,
    page_limit: PageNo,
}

/// Disk manager that keeps every page in memory. Counts reads and writes
/// so callers can observe exactly what the buffer pool sends to disk.
pub struct MemoryDiskManager {
    files: Mutex<HashMap<FileId, MemoryFile>>,
    mono_id: AtomicU64,

    num_reads: AtomicU64,
    num_writes: AtomicU64,
}

impl MemoryDiskManager {
    pub fn new() -> Self {
        MemoryDiskManager {
            files: Mutex::new(HashMap::new()),
            mono_id: AtomicU64::new(0),
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        }
    }

    pub fn register_file(&self, name: &str) -> FileId {
        self.register_file_with_limit(name, MAX_PAGES_PER_FILE)
    }

    /// Registers a file that refuses to allocate more than `page_limit` pages.
    pub fn register_file_with_limit(&self, name: &str, page_limit: PageNo) -> FileId {
        let file_id = self.mono_id.fetch_add(1, Ordering::SeqCst);
        self.files.lock().insert(
            file_id,
            MemoryFile {
                name: name.to_string(),
                pages: Vec::new(),
                page_limit,
            },
        );
        file_id
    }

    pub fn num_pages(&self, file_id: FileId) -> Option<PageNo> {
        self.files
            .lock()
            .get(&file_id)
            .map(|file| file.pages.len() as PageNo)
    }

    /// Copy of a page as it currently sits on "disk".
    pub fn page_bytes(&self, file_id: FileId, page_no: PageNo) -> Option<Vec<u8>> {
        self.files
            .lock()
            .get(&file_id)?
            .pages
            .get(page_no as usize)
            .map(|page| page.to_vec())
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl Default for MemoryDiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, file_id: FileId, page_no: PageNo, page_data: &mut [u8]) -> Result<()> {
        ensure!(page_data.len() == PAGE_SIZE, "partial page read");
        let files = self.files.lock();
        let file = files
            .get(&file_id)
            .with_context(|| format!("file {} not found", file_id))?;
        let page = file
            .pages
            .get(page_no as usize)
            .with_context(|| format!("page {} has not been allocated in {}", page_no, file.name))?;
        page_data.copy_from_slice(page);
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_page(&self, file_id: FileId, page_no: PageNo, page_data: &[u8]) -> Result<()> {
        ensure!(page_data.len() == PAGE_SIZE, "partial page write");
        let mut files = self.files.lock();
        let file = files
            .get_mut(&file_id)
            .with_context(|| format!("file {} not found", file_id))?;
        let name = file.name.clone();
        let page = file
            .pages
            .get_mut(page_no as usize)
            .with_context(|| format!("page {} has not been allocated in {}", page_no, name))?;
        page.copy_from_slice(page_data);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate_page(&self, file_id: FileId) -> Option<PageNo> {
        let mut files = self.files.lock();
        let file = files.get_mut(&file_id)?;
        let page_no = file.pages.len() as PageNo;
        if page_no >= file.page_limit {
            return None;
        }
        file.pages.push(vec![0u8; PAGE_SIZE].into_boxed_slice());
        Some(page_no)
    }

    fn file_name(&self, file_id: FileId) -> String {
        self.files
            .lock()
            .get(&file_id)
            .map(|file| file.name.clone())
            .unwrap_or_else(|| format!("<file {}>", file_id))
    }
}
