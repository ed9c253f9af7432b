use thiserror::Error;

use crate::storage::page::page::{FileId, PageId, PageNo};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer pool exhausted: no free frame and every resident page is pinned")]
    PoolExhausted,
    #[error("page {0} is not resident in the buffer pool")]
    PageNotResident(PageId),
    #[error("page {0} is not resident or is already unpinned")]
    InvalidUnpin(PageId),
    #[error("page {0} is pinned and cannot be deleted")]
    PagePinned(PageId),
    #[error("unable to allocate a new page in file {0}")]
    AllocationFailed(FileId),
    #[error("disk I/O failed for page {page}")]
    Io {
        page: PageId,
        #[source]
        source: anyhow::Error,
    },
}

pub type BufferResult<T> = Result<T, BufferError>;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid slot number {slot_no} on page {page_no}")]
    InvalidSlot { page_no: PageNo, slot_no: usize },
    #[error("no record at page {page_no} slot {slot_no}")]
    RecordNotFound { page_no: PageNo, slot_no: usize },
    #[error("page {page_no} does not exist in file `{file}`")]
    PageNotExist { file: String, page_no: PageNo },
    #[error("record size {0} is not supported")]
    InvalidRecordSize(usize),
    #[error("record buffer holds {found} bytes, expected {expected}")]
    RecordSizeMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;
