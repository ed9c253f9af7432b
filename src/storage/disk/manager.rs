use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{bail, ensure, Context, Result};
use parking_lot::Mutex;
use tracing::debug;

use crate::storage::page::page::{page_constants::PAGE_SIZE, FileId, PageNo};

// Page numbers are handed out monotonically and never reclaimed. Record
// pages link to each other with signed 32-bit page numbers.
pub const MAX_PAGES_PER_FILE: PageNo = i32::MAX as PageNo;

/// Fixed-size page I/O against files identified by a `FileId`.
///
/// Every read and write moves exactly `PAGE_SIZE` bytes.
pub trait DiskManager: Send + Sync {
    fn read_page(&self, file_id: FileId, page_no: PageNo, page_data: &mut [u8]) -> Result<()>;
    fn write_page(&self, file_id: FileId, page_no: PageNo, page_data: &[u8]) -> Result<()>;
    /// Assigns a fresh page number in `file_id`. `None` when the file is
    /// unknown or out of page numbers.
    fn allocate_page(&self, file_id: FileId) -> Option<PageNo>;
    fn file_name(&self, file_id: FileId) -> String;
}

struct FileMetadata {
    file: File,
    path: PathBuf,
    // Number of page numbers handed out so far
    num_pages: PageNo,
}

#[derive(Default)]
struct OpenFiles {
    files: HashMap<FileId, FileMetadata>,
    path_map: HashMap<PathBuf, FileId>,
}

/// Disk manager backed by regular files, one file per record file.
pub struct FileDiskManager {
    open_files: Mutex<OpenFiles>,
    // Monotonic file identifier
    mono_id: AtomicU64,

    num_reads: AtomicU64,
    num_writes: AtomicU64,
}

impl FileDiskManager {
    pub fn new() -> Self {
        FileDiskManager {
            open_files: Mutex::new(OpenFiles::default()),
            mono_id: AtomicU64::new(0),
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        }
    }

    pub fn is_file(path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    pub fn create_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("failed to create db file {}", path.display()))?;
        debug!(path = %path.display(), "created db file");
        Ok(())
    }

    pub fn destroy_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.open_files.lock().path_map.contains_key(path) {
            bail!("db file {} is still open", path.display());
        }
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove db file {}", path.display()))?;
        debug!(path = %path.display(), "destroyed db file");
        Ok(())
    }

    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<FileId> {
        let path = path.as_ref().to_path_buf();
        let mut open_files = self.open_files.lock();
        if open_files.path_map.contains_key(&path) {
            bail!("db file {} is already open", path.display());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open db file {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat db file {}", path.display()))?
            .len();
        let num_pages = len.div_ceil(PAGE_SIZE as u64) as PageNo;

        let file_id = self.mono_id.fetch_add(1, Ordering::SeqCst);
        open_files.path_map.insert(path.clone(), file_id);
        open_files.files.insert(
            file_id,
            FileMetadata {
                file,
                path,
                num_pages,
            },
        );
        debug!(file_id, num_pages, "opened db file");
        Ok(file_id)
    }

    pub fn close_file(&self, file_id: FileId) -> Result<()> {
        let mut open_files = self.open_files.lock();
        let file_meta = open_files
            .files
            .remove(&file_id)
            .with_context(|| format!("file {} is not open", file_id))?;
        open_files.path_map.remove(&file_meta.path);
        file_meta
            .file
            .sync_all()
            .with_context(|| format!("failed to sync {}", file_meta.path.display()))?;
        debug!(file_id, "closed db file");
        Ok(())
    }

    pub fn num_pages(&self, file_id: FileId) -> Option<PageNo> {
        self.open_files
            .lock()
            .files
            .get(&file_id)
            .map(|file_meta| file_meta.num_pages)
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl Default for FileDiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, file_id: FileId, page_no: PageNo, page_data: &mut [u8]) -> Result<()> {
        ensure!(
            page_data.len() == PAGE_SIZE,
            "page buffer holds {} bytes, expected {}",
            page_data.len(),
            PAGE_SIZE
        );

        let mut open_files = self.open_files.lock();
        let file_meta = open_files
            .files
            .get_mut(&file_id)
            .with_context(|| format!("file {} is not open", file_id))?;
        ensure!(
            page_no < file_meta.num_pages,
            "page {} has not been allocated in {}",
            page_no,
            file_meta.path.display()
        );

        let offset = page_no as u64 * PAGE_SIZE as u64;
        let len = file_meta.file.metadata()?.len();
        if offset >= len {
            // Allocated but never written
            page_data.fill(0);
        } else {
            file_meta
                .file
                .seek(SeekFrom::Start(offset))
                .with_context(|| format!("I/O error while seeking page {}", page_no))?;
            file_meta
                .file
                .read_exact(page_data)
                .with_context(|| format!("I/O error while reading page {}", page_no))?;
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_page(&self, file_id: FileId, page_no: PageNo, page_data: &[u8]) -> Result<()> {
        ensure!(
            page_data.len() == PAGE_SIZE,
            "page buffer holds {} bytes, expected {}",
            page_data.len(),
            PAGE_SIZE
        );

        let mut open_files = self.open_files.lock();
        let file_meta = open_files
            .files
            .get_mut(&file_id)
            .with_context(|| format!("file {} is not open", file_id))?;
        ensure!(
            page_no < file_meta.num_pages,
            "page {} has not been allocated in {}",
            page_no,
            file_meta.path.display()
        );

        let offset = page_no as u64 * PAGE_SIZE as u64;
        file_meta
            .file
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("I/O error while seeking page {}", page_no))?;
        file_meta
            .file
            .write_all(page_data)
            .with_context(|| format!("I/O error while writing page {}", page_no))?;
        file_meta
            .file
            .flush()
            .with_context(|| format!("error flushing page {}", page_no))?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn allocate_page(&self, file_id: FileId) -> Option<PageNo> {
        let mut open_files = self.open_files.lock();
        let file_meta = open_files.files.get_mut(&file_id)?;
        if file_meta.num_pages >= MAX_PAGES_PER_FILE {
            return None;
        }
        let page_no = file_meta.num_pages;
        file_meta.num_pages += 1;
        Some(page_no)
    }

    fn file_name(&self, file_id: FileId) -> String {
        self.open_files
            .lock()
            .files
            .get(&file_id)
            .map(|file_meta| file_meta.path.display().to_string())
            .unwrap_or_else(|| format!("<file {}>", file_id))
    }
}
