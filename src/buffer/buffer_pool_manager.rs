use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::{
    errors::{BufferError, BufferResult},
    storage::{
        disk::manager::DiskManager,
        page::{
            page::{FileId, FrameId, Page, PageId},
            page_guard::PageGuard,
        },
    },
    utils::replacer::{LruReplacer, Replacer},
};

#[derive(Debug)]
pub struct FrameHeader {
    pub frame_id: FrameId,
    pub page_id: Option<PageId>,
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl FrameHeader {
    fn new(frame_id: FrameId) -> Self {
        FrameHeader {
            frame_id,
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        }
    }
}

// Everything the pool latch protects
struct PoolState {
    frames: Vec<FrameHeader>,
    page_table: HashMap<PageId, FrameId>,
    free_frames: VecDeque<FrameId>,
}

/// Fixed-size page cache between the record layer and the disk manager.
///
/// A frame is always in exactly one of three states: free (in the free
/// list, no page), pinned (bound to a page, pin count above zero, not in
/// the replacer) or unpinned (bound, pin count zero, tracked by the
/// replacer).
///
/// All operations are serialized by one latch, which is also held across
/// disk I/O. The replacer has its own latch and is only entered while the
/// pool latch is held. Frame bytes sit behind a per-frame lock; the pool
/// only touches the bytes of a frame it is installing, evicting or
/// flushing, so a caller must not hold the bytes of one page while asking
/// the pool for another.
pub struct BufferPoolManager {
    num_frames: usize,

    state: Mutex<PoolState>,

    // The bytes of every frame, indexed by frame id
    pages: Vec<RwLock<Page>>,

    replacer: LruReplacer<FrameId>,

    disk_manager: Arc<dyn DiskManager>,
}

impl BufferPoolManager {
    pub fn new(num_frames: usize, disk_manager: Arc<dyn DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(num_frames);
        let mut pages = Vec::with_capacity(num_frames);
        let mut free_frames = VecDeque::with_capacity(num_frames);

        for i in 0..num_frames {
            let frame_id = i as FrameId;
            frames.push(FrameHeader::new(frame_id));
            pages.push(RwLock::new(Page::new()));
            free_frames.push_back(frame_id);
        }

        Self {
            num_frames,
            state: Mutex::new(PoolState {
                frames,
                page_table: HashMap::with_capacity(num_frames),
                free_frames,
            }),
            pages,
            replacer: LruReplacer::new(num_frames),
            disk_manager,
        }
    }

    pub fn disk_manager(&self) -> &Arc<dyn DiskManager> {
        &self.disk_manager
    }

    /// Pins `page_id`, reading it from disk if it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<PageGuard<'_>> {
        let mut state = self.state.lock();

        let resident = state.page_table.get(&page_id).copied();
        if let Some(frame_id) = resident {
            let frame = &mut state.frames[frame_id as usize];
            frame.pin_count += 1;
            self.replacer.pin(frame_id);
            trace!(%page_id, frame_id, pin_count = frame.pin_count, "page hit");
            return Ok(PageGuard::new(self, page_id, frame_id));
        }

        let frame_id = self.find_victim_frame(&mut state)?;
        self.update_frame(&mut state, frame_id, page_id)?;

        let read = {
            let mut page = self.pages[frame_id as usize].write();
            self.disk_manager
                .read_page(page_id.file_id, page_id.page_no, &mut page.data)
        };
        if let Err(source) = read {
            warn!(%page_id, frame_id, "failed to read page, releasing frame");
            self.release_frame(&mut state, frame_id);
            return Err(BufferError::Io {
                page: page_id,
                source,
            });
        }

        let frame = &mut state.frames[frame_id as usize];
        frame.pin_count = 1;
        frame.is_dirty = false;
        self.replacer.pin(frame_id);
        trace!(%page_id, frame_id, "page read into frame");

        Ok(PageGuard::new(self, page_id, frame_id))
    }

    /// Allocates a fresh page in `file_id` and pins it with zeroed content.
    pub fn new_page(&self, file_id: FileId) -> BufferResult<PageGuard<'_>> {
        let mut state = self.state.lock();

        let frame_id = self.find_victim_frame(&mut state)?;

        let page_no = match self.disk_manager.allocate_page(file_id) {
            Some(page_no) => page_no,
            None => {
                warn!(file_id, "page allocation failed");
                self.return_victim_frame(&mut state, frame_id);
                return Err(BufferError::AllocationFailed(file_id));
            }
        };
        let page_id = PageId::new(file_id, page_no);

        self.update_frame(&mut state, frame_id, page_id)?;

        let frame = &mut state.frames[frame_id as usize];
        frame.pin_count = 1;
        frame.is_dirty = false;
        self.replacer.pin(frame_id);
        debug!(%page_id, frame_id, "new page");

        Ok(PageGuard::new(self, page_id, frame_id))
    }

    /// Drops one pin on `page_id`. A `true` dirty flag sticks until the next
    /// flush; `false` never clears it.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let mut state = self.state.lock();

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferError::InvalidUnpin(page_id))?;
        let frame = &mut state.frames[frame_id as usize];

        if frame.pin_count == 0 {
            return Err(BufferError::InvalidUnpin(page_id));
        }

        frame.pin_count -= 1;
        if is_dirty {
            frame.is_dirty = true;
        }
        if frame.pin_count == 0 {
            self.replacer.unpin(frame_id);
        }
        trace!(%page_id, frame_id, pin_count = frame.pin_count, is_dirty, "unpin");

        Ok(())
    }

    /// Writes `page_id` to disk whether or not it is dirty or pinned.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotResident(page_id))?;

        self.write_frame(page_id, frame_id)?;
        state.frames[frame_id as usize].is_dirty = false;

        Ok(())
    }

    /// Writes back every dirty resident page of `file_id`. Clean pages are
    /// left alone.
    pub fn flush_all_pages(&self, file_id: FileId) -> BufferResult<()> {
        let mut state = self.state.lock();

        let mut resident: Vec<(PageId, FrameId)> = state
            .page_table
            .iter()
            .filter(|(page_id, _)| page_id.file_id == file_id)
            .map(|(page_id, frame_id)| (*page_id, *frame_id))
            .collect();
        resident.sort();

        let mut flushed = 0usize;
        for (page_id, frame_id) in resident {
            if !state.frames[frame_id as usize].is_dirty {
                continue;
            }
            self.write_frame(page_id, frame_id)?;
            state.frames[frame_id as usize].is_dirty = false;
            flushed += 1;
        }
        debug!(file_id, flushed, "flushed file");

        Ok(())
    }

    /// Drops `page_id` from the pool and frees its frame. A page that is
    /// not resident is already deleted.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(()),
        };

        let frame = &state.frames[frame_id as usize];
        if frame.pin_count > 0 {
            return Err(BufferError::PagePinned(page_id));
        }
        if frame.is_dirty {
            self.write_frame(page_id, frame_id)?;
        }

        self.release_frame(&mut state, frame_id);
        debug!(%page_id, frame_id, "deleted page");

        Ok(())
    }

    pub fn pool_size(&self) -> usize {
        self.num_frames
    }

    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        let frame_id = state.page_table.get(&page_id)?;
        Some(state.frames[*frame_id as usize].pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        let frame_id = state.page_table.get(&page_id)?;
        Some(state.frames[*frame_id as usize].is_dirty)
    }

    pub fn free_frames(&self) -> usize {
        self.state.lock().free_frames.len()
    }

    pub fn replacer_size(&self) -> usize {
        self.replacer.size()
    }

    pub(crate) fn page(&self, frame_id: FrameId) -> &RwLock<Page> {
        &self.pages[frame_id as usize]
    }

    // Prefers a never-used frame, then the replacer's victim.
    fn find_victim_frame(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        if let Some(frame_id) = state.free_frames.pop_front() {
            return Ok(frame_id);
        }

        match self.replacer.victim() {
            Some(frame_id) => {
                trace!(frame_id, "replacer chose victim");
                Ok(frame_id)
            }
            None => {
                debug!("buffer pool exhausted");
                Err(BufferError::PoolExhausted)
            }
        }
    }

    // Puts a victim back where it came from when it ends up unused.
    fn return_victim_frame(&self, state: &mut PoolState, frame_id: FrameId) {
        if state.frames[frame_id as usize].page_id.is_some() {
            self.replacer.unpin(frame_id);
        } else {
            state.free_frames.push_front(frame_id);
        }
    }

    // Evicts the current occupant of `frame_id` (flushing it if dirty) and
    // installs `new_page_id` with zeroed memory.
    fn update_frame(
        &self,
        state: &mut PoolState,
        frame_id: FrameId,
        new_page_id: PageId,
    ) -> BufferResult<()> {
        let frame = &state.frames[frame_id as usize];
        let (old_page_id, old_is_dirty) = (frame.page_id, frame.is_dirty);

        if let Some(old_page_id) = old_page_id {
            if old_is_dirty {
                if let Err(err) = self.write_frame(old_page_id, frame_id) {
                    self.return_victim_frame(state, frame_id);
                    return Err(err);
                }
                debug!(%old_page_id, frame_id, "flushed dirty victim");
            }
            state.page_table.remove(&old_page_id);
            trace!(%old_page_id, frame_id, "evicted");
        }

        state.page_table.insert(new_page_id, frame_id);
        let frame = &mut state.frames[frame_id as usize];
        frame.page_id = Some(new_page_id);
        frame.pin_count = 0;
        frame.is_dirty = false;
        self.pages[frame_id as usize].write().reset_memory();

        Ok(())
    }

    // Unbinds `frame_id` and returns it to the free list.
    fn release_frame(&self, state: &mut PoolState, frame_id: FrameId) {
        let frame = &mut state.frames[frame_id as usize];
        if let Some(page_id) = frame.page_id.take() {
            state.page_table.remove(&page_id);
        }
        frame.pin_count = 0;
        frame.is_dirty = false;
        self.pages[frame_id as usize].write().reset_memory();

        self.replacer.pin(frame_id);
        state.free_frames.push_back(frame_id);
    }

    fn write_frame(&self, page_id: PageId, frame_id: FrameId) -> BufferResult<()> {
        let page = self.pages[frame_id as usize].read();
        self.disk_manager
            .write_page(page_id.file_id, page_id.page_no, &page.data)
            .map_err(|source| BufferError::Io {
                page: page_id,
                source,
            })
    }
}
