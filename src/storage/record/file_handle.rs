use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    buffer::buffer_pool_manager::BufferPoolManager,
    errors::{RecordError, RecordResult},
    storage::{
        page::page::{page_constants::PAGE_SIZE, FileId, PageId, PageNo},
        record::{
            page_handle::RmPageHandle,
            rm_defs::{
                rm_constants::{RM_FILE_HDR_PAGE, RM_FIRST_RECORD_PAGE},
                Record, Rid, RmFileHdr,
            },
        },
    },
};

/// Fixed-size record storage over the pages of one file.
///
/// Page 0 holds the file header, which is cached here and written straight
/// to disk whenever the page count or the free-page list changes. Data
/// pages go through the buffer pool. Pages with at least one free slot form
/// a singly linked list threaded through their page headers, headed by
/// `first_free_page_no`.
pub struct RmFileHandle {
    file_id: FileId,
    file_hdr: Mutex<RmFileHdr>,
    bpm: Arc<BufferPoolManager>,
}

impl RmFileHandle {
    pub fn new(file_id: FileId, file_hdr: RmFileHdr, bpm: Arc<BufferPoolManager>) -> Self {
        RmFileHandle {
            file_id,
            file_hdr: Mutex::new(file_hdr),
            bpm,
        }
    }

    /// Reads the file header from page 0 of `file_id`.
    pub fn open(file_id: FileId, bpm: Arc<BufferPoolManager>) -> RecordResult<Self> {
        let mut buf = vec![0u8; PAGE_SIZE];
        bpm.disk_manager()
            .read_page(file_id, RM_FILE_HDR_PAGE, &mut buf)?;
        let file_hdr = RmFileHdr::decode(&buf)?;
        debug!(file_id, ?file_hdr, "opened record file");
        Ok(Self::new(file_id, file_hdr, bpm))
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Snapshot of the cached file header.
    pub fn file_hdr(&self) -> RmFileHdr {
        *self.file_hdr.lock()
    }

    pub fn record_size(&self) -> usize {
        self.file_hdr.lock().record_size
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    pub fn get_record(&self, rid: Rid) -> RecordResult<Record> {
        let file_hdr = self.file_hdr();
        let ph = self.fetch_page_handle_with(&file_hdr, rid.page_no)?;
        Self::check_slot(&file_hdr, &ph, rid)?;

        let record = Record {
            data: ph.read_slot(rid.slot_no),
        };
        ph.unpin(false)?;

        Ok(record)
    }

    /// Stores `buf` in the first free slot of the file and returns its
    /// location.
    pub fn insert_record(&self, buf: &[u8]) -> RecordResult<Rid> {
        let mut file_hdr = self.file_hdr.lock();
        Self::check_len(&file_hdr, buf)?;

        let (mut ph, slot_no) = self.free_page_handle(&mut file_hdr)?;

        ph.fill_slot(slot_no, buf);
        let mut page_hdr = ph.page_hdr();
        page_hdr.num_records += 1;

        // Full pages leave the free list
        let unlink = page_hdr.num_records == file_hdr.num_records_per_page
            && file_hdr.first_free_page_no == Some(ph.page_no());
        if unlink {
            file_hdr.first_free_page_no = page_hdr.next_free_page_no;
            page_hdr.next_free_page_no = None;
        }
        ph.set_page_hdr(&page_hdr);
        if unlink {
            self.persist_file_hdr(&file_hdr)?;
            trace!(page_no = ph.page_no(), "page full, unlinked from free list");
        }

        let rid = Rid::new(ph.page_no(), slot_no);
        ph.unpin(true)?;

        Ok(rid)
    }

    /// Writes `buf` at `rid` whatever the slot held before. A page this
    /// fills up is taken off the free-page list.
    pub fn insert_record_at(&self, rid: Rid, buf: &[u8]) -> RecordResult<()> {
        let mut file_hdr = self.file_hdr.lock();
        Self::check_len(&file_hdr, buf)?;

        let mut ph = self.fetch_page_handle_with(&file_hdr, rid.page_no)?;
        if rid.slot_no >= file_hdr.num_records_per_page {
            return Err(RecordError::InvalidSlot {
                page_no: rid.page_no,
                slot_no: rid.slot_no,
            });
        }

        if !ph.fill_slot(rid.slot_no, buf) {
            ph.unpin(true)?;
            return Ok(());
        }

        let mut page_hdr = ph.page_hdr();
        page_hdr.num_records += 1;
        let full = page_hdr.num_records == file_hdr.num_records_per_page;
        let next_free_page_no = page_hdr.next_free_page_no;
        if full {
            page_hdr.next_free_page_no = None;
        }
        ph.set_page_hdr(&page_hdr);
        ph.unpin(true)?;

        if full {
            self.unlink_free_page(&mut file_hdr, rid.page_no, next_free_page_no)?;
        }

        Ok(())
    }

    pub fn delete_record(&self, rid: Rid) -> RecordResult<()> {
        let mut file_hdr = self.file_hdr.lock();

        let mut ph = self.fetch_page_handle_with(&file_hdr, rid.page_no)?;
        Self::check_slot(&file_hdr, &ph, rid)?;

        let was_full = ph.is_full();
        ph.clear_slot(rid.slot_no);
        let mut page_hdr = ph.page_hdr();
        page_hdr.num_records -= 1;
        ph.set_page_hdr(&page_hdr);

        if was_full {
            self.release_page_handle(&mut ph, &mut file_hdr);
            self.persist_file_hdr(&file_hdr)?;
        }
        ph.unpin(true)?;

        Ok(())
    }

    pub fn update_record(&self, rid: Rid, buf: &[u8]) -> RecordResult<()> {
        let file_hdr = self.file_hdr();
        Self::check_len(&file_hdr, buf)?;

        let mut ph = self.fetch_page_handle_with(&file_hdr, rid.page_no)?;
        Self::check_slot(&file_hdr, &ph, rid)?;

        ph.overwrite_slot(rid.slot_no, buf);
        ph.unpin(true)?;

        Ok(())
    }

    /// Pins data page `page_no`. The handle unpins when dropped.
    pub fn fetch_page_handle(&self, page_no: PageNo) -> RecordResult<RmPageHandle<'_>> {
        let file_hdr = self.file_hdr();
        self.fetch_page_handle_with(&file_hdr, page_no)
    }

    /// Writes the cached header and every dirty page of the file to disk.
    pub fn flush(&self) -> RecordResult<()> {
        let file_hdr = self.file_hdr.lock();
        self.persist_file_hdr(&file_hdr)?;
        self.bpm.flush_all_pages(self.file_id)?;
        Ok(())
    }

    pub fn file_name(&self) -> String {
        self.bpm.disk_manager().file_name(self.file_id)
    }

    fn fetch_page_handle_with(
        &self,
        file_hdr: &RmFileHdr,
        page_no: PageNo,
    ) -> RecordResult<RmPageHandle<'_>> {
        if page_no < RM_FIRST_RECORD_PAGE || page_no >= file_hdr.num_pages {
            return Err(RecordError::PageNotExist {
                file: self.file_name(),
                page_no,
            });
        }

        let guard = self.bpm.fetch_page(PageId::new(self.file_id, page_no))?;
        Ok(RmPageHandle::new(guard, file_hdr))
    }

    // Head of the free-page list, or a new page pushed onto it.
    fn create_page_handle(&self, file_hdr: &mut RmFileHdr) -> RecordResult<RmPageHandle<'_>> {
        match file_hdr.first_free_page_no {
            Some(page_no) => self.fetch_page_handle_with(file_hdr, page_no),
            None => self.create_new_page_handle(file_hdr),
        }
    }

    // A page with a free slot, and that slot. Full pages found at the head
    // of the free-page list are unlinked on the way.
    fn free_page_handle(
        &self,
        file_hdr: &mut RmFileHdr,
    ) -> RecordResult<(RmPageHandle<'_>, usize)> {
        for _ in 0..=file_hdr.num_pages {
            let mut ph = self.create_page_handle(file_hdr)?;
            if let Some(slot_no) = ph.first_free_slot() {
                return Ok((ph, slot_no));
            }

            let page_no = ph.page_no();
            let mut page_hdr = ph.page_hdr();
            file_hdr.first_free_page_no = page_hdr
                .next_free_page_no
                .filter(|&next_free_page_no| next_free_page_no != page_no);
            page_hdr.next_free_page_no = None;
            ph.set_page_hdr(&page_hdr);
            ph.unpin(true)?;
            self.persist_file_hdr(file_hdr)?;
            warn!(page_no, file = %self.file_name(), "full page unlinked from free list head");
        }

        Err(RecordError::Io(anyhow!(
            "free page list of {} does not end",
            self.file_name()
        )))
    }

    // Removes `page_no` from the free-page list, wherever it sits.
    fn unlink_free_page(
        &self,
        file_hdr: &mut RmFileHdr,
        page_no: PageNo,
        next_free_page_no: Option<PageNo>,
    ) -> RecordResult<()> {
        if file_hdr.first_free_page_no == Some(page_no) {
            file_hdr.first_free_page_no = next_free_page_no;
            self.persist_file_hdr(file_hdr)?;
            trace!(page_no, "page full, unlinked from free list");
            return Ok(());
        }

        let mut cursor = file_hdr.first_free_page_no;
        for _ in 0..file_hdr.num_pages {
            let Some(curr_page_no) = cursor else {
                return Ok(());
            };
            let mut curr = self.fetch_page_handle_with(file_hdr, curr_page_no)?;
            let mut curr_hdr = curr.page_hdr();
            if curr_hdr.next_free_page_no == Some(page_no) {
                curr_hdr.next_free_page_no = next_free_page_no;
                curr.set_page_hdr(&curr_hdr);
                curr.unpin(true)?;
                trace!(page_no, prev = curr_page_no, "page full, unlinked from free list");
                return Ok(());
            }
            cursor = curr_hdr.next_free_page_no;
            curr.unpin(false)?;
        }

        Err(RecordError::Io(anyhow!(
            "free page list of {} does not end",
            self.file_name()
        )))
    }

    fn create_new_page_handle(&self, file_hdr: &mut RmFileHdr) -> RecordResult<RmPageHandle<'_>> {
        let guard = self.bpm.new_page(self.file_id)?;
        let page_no = guard.page_id().page_no;

        let mut ph = RmPageHandle::new(guard, file_hdr);
        ph.init();

        if page_no >= file_hdr.num_pages {
            file_hdr.num_pages = page_no + 1;
        }
        let mut page_hdr = ph.page_hdr();
        page_hdr.next_free_page_no = file_hdr.first_free_page_no;
        ph.set_page_hdr(&page_hdr);
        file_hdr.first_free_page_no = Some(page_no);

        self.persist_file_hdr(file_hdr)?;
        debug!(file_id = self.file_id, page_no, "new data page");

        Ok(ph)
    }

    // Pushes a page that just gained a free slot onto the free-page list.
    fn release_page_handle(&self, ph: &mut RmPageHandle<'_>, file_hdr: &mut RmFileHdr) {
        if file_hdr.first_free_page_no == Some(ph.page_no()) {
            return;
        }
        let mut page_hdr = ph.page_hdr();
        page_hdr.next_free_page_no = file_hdr.first_free_page_no;
        ph.set_page_hdr(&page_hdr);
        file_hdr.first_free_page_no = Some(ph.page_no());
        trace!(page_no = ph.page_no(), "page relinked onto free list");
    }

    fn persist_file_hdr(&self, file_hdr: &RmFileHdr) -> RecordResult<()> {
        let mut buf = vec![0u8; PAGE_SIZE];
        file_hdr.encode(&mut buf);
        self.bpm
            .disk_manager()
            .write_page(self.file_id, RM_FILE_HDR_PAGE, &buf)?;
        Ok(())
    }

    fn check_len(file_hdr: &RmFileHdr, buf: &[u8]) -> RecordResult<()> {
        if buf.len() != file_hdr.record_size {
            return Err(RecordError::RecordSizeMismatch {
                expected: file_hdr.record_size,
                found: buf.len(),
            });
        }
        Ok(())
    }

    fn check_slot(file_hdr: &RmFileHdr, ph: &RmPageHandle<'_>, rid: Rid) -> RecordResult<()> {
        if rid.slot_no >= file_hdr.num_records_per_page {
            return Err(RecordError::InvalidSlot {
                page_no: rid.page_no,
                slot_no: rid.slot_no,
            });
        }
        if !ph.is_set(rid.slot_no) {
            return Err(RecordError::RecordNotFound {
                page_no: rid.page_no,
                slot_no: rid.slot_no,
            });
        }
        Ok(())
    }
}
