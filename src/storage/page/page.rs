use std::fmt;

use page_constants::PAGE_SIZE;

pub type FileId = u64;
pub type PageNo = u32;
pub type FrameId = u32;

pub mod page_constants {
    // Size of every disk page and every buffer frame
    pub const PAGE_SIZE: usize = 1024 * 4;
}

/// Identity of a disk page: the file it belongs to and its number there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub file_id: FileId,
    pub page_no: PageNo,
}

impl PageId {
    pub fn new(file_id: FileId, page_no: PageNo) -> Self {
        PageId { file_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.page_no)
    }
}

/// The bytes of one frame.
pub struct Page {
    pub data: Box<[u8]>,
}

impl Page {
    pub fn new() -> Self {
        Page {
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    pub fn reset_memory(&mut self) {
        self.data.fill(0);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}
