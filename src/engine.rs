use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::{
    buffer::buffer_pool_manager::BufferPoolManager,
    errors::RecordResult,
    storage::{
        disk::{DiskManager, FileDiskManager},
        page::page::{page_constants::PAGE_SIZE, FileId, PageId},
        record::{
            file_handle::RmFileHandle,
            rm_defs::{
                rm_constants::{RM_FILE_HDR_PAGE, RM_FIRST_RECORD_PAGE},
                RmFileHdr,
            },
        },
    },
};

pub const DEFAULT_POOL_SIZE: usize = 64;
pub const DEFAULT_DATA_DIR: &str = "geodeData";

pub const POOL_SIZE_ENV: &str = "GEODE_POOL_SIZE";
pub const DATA_DIR_ENV: &str = "GEODE_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    // Number of frames in the buffer pool
    pub pool_size: usize,
    // Directory holding one db file per record file
    pub data_dir: PathBuf,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            pool_size: DEFAULT_POOL_SIZE,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl StorageOptions {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Defaults overridden by `GEODE_POOL_SIZE` and `GEODE_DATA_DIR`. A pool
    /// size that is not a positive integer is ignored.
    pub fn from_env() -> Self {
        let mut options = StorageOptions::default();

        if let Ok(raw) = env::var(POOL_SIZE_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(pool_size) if pool_size > 0 => options.pool_size = pool_size,
                _ => warn!(
                    value = %raw,
                    default = DEFAULT_POOL_SIZE,
                    "invalid {}, using default",
                    POOL_SIZE_ENV
                ),
            }
        }

        if let Ok(raw) = env::var(DATA_DIR_ENV) {
            if raw.trim().is_empty() {
                warn!(default = DEFAULT_DATA_DIR, "empty {}, using default", DATA_DIR_ENV);
            } else {
                options.data_dir = PathBuf::from(raw);
            }
        }

        options
    }
}

/// Owns the buffer pool and the disk files under `data_dir`, and manages
/// the lifecycle of record files stored there.
pub struct StorageEngine {
    options: StorageOptions,
    disk_manager: Arc<FileDiskManager>,
    bpm: Arc<BufferPoolManager>,
}

impl StorageEngine {
    pub fn open(options: StorageOptions) -> RecordResult<StorageEngine> {
        std::fs::create_dir_all(&options.data_dir).with_context(|| {
            format!(
                "failed to create data directory {}",
                options.data_dir.display()
            )
        })?;

        let disk_manager = Arc::new(FileDiskManager::new());
        let bpm = Arc::new(BufferPoolManager::new(
            options.pool_size,
            disk_manager.clone() as Arc<dyn DiskManager>,
        ));
        info!(
            pool_size = options.pool_size,
            data_dir = %options.data_dir.display(),
            "storage engine started"
        );

        Ok(StorageEngine {
            options,
            disk_manager,
            bpm,
        })
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    pub fn disk_manager(&self) -> &Arc<FileDiskManager> {
        &self.disk_manager
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.options.data_dir.join(name)
    }

    pub fn file_exists(&self, name: &str) -> bool {
        FileDiskManager::is_file(self.file_path(name))
    }

    /// Creates an empty record file holding records of `record_size` bytes.
    /// The file starts with only its header page.
    pub fn create_file(&self, name: &str, record_size: usize) -> RecordResult<()> {
        let file_hdr = RmFileHdr::new(record_size)?;
        let path = self.file_path(name);

        self.disk_manager.create_file(&path)?;
        let file_id = self.disk_manager.open_file(&path)?;

        let written = self.write_initial_hdr(&path, file_id, &file_hdr);
        let closed = self.disk_manager.close_file(file_id);
        written?;
        closed?;

        debug!(
            file = name,
            record_size,
            records_per_page = file_hdr.num_records_per_page,
            "created record file"
        );
        Ok(())
    }

    pub fn open_file(&self, name: &str) -> RecordResult<RmFileHandle> {
        let path = self.file_path(name);
        let file_id = self.disk_manager.open_file(&path)?;

        match RmFileHandle::open(file_id, self.bpm.clone()) {
            Ok(file_handle) => Ok(file_handle),
            Err(err) => {
                if let Err(close_err) = self.disk_manager.close_file(file_id) {
                    warn!(file = name, %close_err, "failed to close file after open error");
                }
                Err(err)
            }
        }
    }

    /// Persists the header and dirty pages of the file, evicts its pages
    /// from the pool and closes it. Fails if a page of the file is still
    /// pinned.
    pub fn close_file(&self, file_handle: RmFileHandle) -> RecordResult<()> {
        file_handle.flush()?;

        let file_id = file_handle.file_id();
        let file_name = file_handle.file_name();
        for page_no in RM_FIRST_RECORD_PAGE..file_handle.file_hdr().num_pages {
            self.bpm.delete_page(PageId::new(file_id, page_no))?;
        }

        self.disk_manager.close_file(file_id)?;
        debug!(file = %file_name, "closed record file");
        Ok(())
    }

    pub fn destroy_file(&self, name: &str) -> RecordResult<()> {
        self.disk_manager.destroy_file(self.file_path(name))?;
        debug!(file = name, "destroyed record file");
        Ok(())
    }

    fn write_initial_hdr(
        &self,
        path: &Path,
        file_id: FileId,
        file_hdr: &RmFileHdr,
    ) -> RecordResult<()> {
        let page_no = self
            .disk_manager
            .allocate_page(file_id)
            .with_context(|| format!("no header page available in {}", path.display()))?;
        debug_assert_eq!(page_no, RM_FILE_HDR_PAGE);

        let mut buf = vec![0u8; PAGE_SIZE];
        file_hdr.encode(&mut buf);
        self.disk_manager.write_page(file_id, page_no, &buf)?;
        Ok(())
    }
}
