use crate::{
    errors::BufferResult,
    storage::{
        page::{
            page::{PageId, PageNo},
            page_guard::PageGuard,
        },
        record::rm_defs::{RmFileHdr, RmPageHdr},
    },
    utils::bitmap,
};

/// A pinned data page of a record file, paired with the file layout so the
/// page header, bitmap and slots can be located.
pub struct RmPageHandle<'a> {
    guard: PageGuard<'a>,
    file_hdr: RmFileHdr,
}

impl<'a> RmPageHandle<'a> {
    pub fn new(guard: PageGuard<'a>, file_hdr: &RmFileHdr) -> Self {
        RmPageHandle {
            guard,
            file_hdr: *file_hdr,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    pub fn page_no(&self) -> PageNo {
        self.guard.page_id().page_no
    }

    pub fn page_hdr(&self) -> RmPageHdr {
        RmPageHdr::decode(&self.guard.data())
    }

    pub fn set_page_hdr(&mut self, page_hdr: &RmPageHdr) {
        page_hdr.encode(&mut self.guard.data_mut());
    }

    /// Resets a freshly allocated page: no records, not linked anywhere.
    pub fn init(&mut self) {
        let bitmap_range = self.bitmap_range();
        let mut data = self.guard.data_mut();
        RmPageHdr {
            next_free_page_no: None,
            num_records: 0,
        }
        .encode(&mut data);
        bitmap::init(&mut data[bitmap_range]);
    }

    pub fn is_set(&self, slot_no: usize) -> bool {
        bitmap::is_set(&self.guard.data()[self.bitmap_range()], slot_no)
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        bitmap::first_bit(
            false,
            &self.guard.data()[self.bitmap_range()],
            self.file_hdr.num_records_per_page,
        )
    }

    /// Next occupied slot after `curr`, or the first one when `curr` is `None`.
    pub fn next_record_slot(&self, curr: Option<usize>) -> Option<usize> {
        bitmap::next_bit(
            true,
            &self.guard.data()[self.bitmap_range()],
            self.file_hdr.num_records_per_page,
            curr,
        )
    }

    pub fn read_slot(&self, slot_no: usize) -> Vec<u8> {
        self.guard.data()[self.slot_range(slot_no)].to_vec()
    }

    /// Copies `buf` into the slot and marks it occupied. Returns whether the
    /// slot was free before.
    pub fn fill_slot(&mut self, slot_no: usize, buf: &[u8]) -> bool {
        let bitmap_range = self.bitmap_range();
        let slot_range = self.slot_range(slot_no);
        let mut data = self.guard.data_mut();

        data[slot_range].copy_from_slice(buf);
        let was_free = !bitmap::is_set(&data[bitmap_range.clone()], slot_no);
        bitmap::set(&mut data[bitmap_range], slot_no);
        was_free
    }

    pub fn overwrite_slot(&mut self, slot_no: usize, buf: &[u8]) {
        let slot_range = self.slot_range(slot_no);
        self.guard.data_mut()[slot_range].copy_from_slice(buf);
    }

    pub fn clear_slot(&mut self, slot_no: usize) {
        let bitmap_range = self.bitmap_range();
        bitmap::reset(&mut self.guard.data_mut()[bitmap_range], slot_no);
    }

    pub fn is_full(&self) -> bool {
        self.page_hdr().num_records == self.file_hdr.num_records_per_page
    }

    pub fn unpin(self, is_dirty: bool) -> BufferResult<()> {
        self.guard.unpin(is_dirty)
    }

    fn bitmap_range(&self) -> std::ops::Range<usize> {
        let start = self.file_hdr.bitmap_offset();
        start..start + self.file_hdr.bitmap_size
    }

    fn slot_range(&self, slot_no: usize) -> std::ops::Range<usize> {
        let start = self.file_hdr.slot_offset(slot_no);
        start..start + self.file_hdr.record_size
    }
}
