use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use crate::{
    buffer::buffer_pool_manager::BufferPoolManager,
    errors::BufferResult,
    storage::page::page::{FrameId, PageId},
};

/// A pin on one resident page.
///
/// The pin is released exactly once: either through [`PageGuard::unpin`]
/// or when the guard is dropped. Writing through [`PageGuard::data_mut`]
/// marks the page dirty for that release.
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    page_id: PageId,
    frame_id: FrameId,
    is_dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page_id: PageId, frame_id: FrameId) -> Self {
        PageGuard {
            bpm,
            page_id,
            frame_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.bpm.page(self.frame_id).read(), |page| &*page.data)
    }

    pub fn data_mut(&mut self) -> MappedRwLockWriteGuard<'_, [u8]> {
        self.is_dirty = true;
        RwLockWriteGuard::map(self.bpm.page(self.frame_id).write(), |page| &mut *page.data)
    }

    /// Releases the pin now. The page is reported dirty if `is_dirty` is set
    /// or the guard was written through.
    pub fn unpin(self, is_dirty: bool) -> BufferResult<()> {
        let bpm = self.bpm;
        let page_id = self.page_id;
        let is_dirty = is_dirty || self.is_dirty;
        std::mem::forget(self);
        bpm.unpin_page(page_id, is_dirty)
    }
}

impl<'a> Drop for PageGuard<'a> {
    fn drop(&mut self) {
        if let Err(err) = self.bpm.unpin_page(self.page_id, self.is_dirty) {
            warn!(page_id = %self.page_id, %err, "page guard failed to unpin");
        }
    }
}
