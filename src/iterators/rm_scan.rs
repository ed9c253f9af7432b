use crate::{
    errors::{RecordError, RecordResult},
    storage::{
        page::page::PageNo,
        record::{file_handle::RmFileHandle, rm_defs::rm_constants::RM_FIRST_RECORD_PAGE, Rid},
    },
};

use super::iterator::StorageIterator;

struct ScanCursor {
    page_no: PageNo,
    // `None` is "before the first slot" of `page_no`
    slot_no: Option<usize>,
}

/// Forward scan over the occupied slots of a record file in (page, slot)
/// order, skipping the header page.
///
/// The scan holds no pin between calls and at most one while advancing.
pub struct RmScan<'a> {
    file_handle: &'a RmFileHandle,
    // `None` once the scan is exhausted
    cursor: Option<ScanCursor>,
    // An advance failure reported by the `Iterator` impl on its next call
    pending_error: Option<RecordError>,
}

impl<'a> RmScan<'a> {
    /// Positions the scan on the first record of the file, if any.
    pub fn new(file_handle: &'a RmFileHandle) -> RecordResult<Self> {
        let mut scan = RmScan {
            file_handle,
            cursor: Some(ScanCursor {
                page_no: RM_FIRST_RECORD_PAGE,
                slot_no: None,
            }),
            pending_error: None,
        };
        scan.advance()?;
        Ok(scan)
    }

    pub fn is_end(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn rid(&self) -> Option<Rid> {
        let cursor = self.cursor.as_ref()?;
        cursor
            .slot_no
            .map(|slot_no| Rid::new(cursor.page_no, slot_no))
    }
}

impl<'a> StorageIterator for RmScan<'a> {
    type Item = Rid;
    type Error = RecordError;

    fn value(&self) -> Option<Rid> {
        self.rid()
    }

    fn is_valid(&self) -> bool {
        !self.is_end()
    }

    fn advance(&mut self) -> RecordResult<()> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(());
        };

        let num_pages = self.file_handle.file_hdr().num_pages;
        while cursor.page_no < num_pages {
            let ph = self.file_handle.fetch_page_handle(cursor.page_no)?;
            let next_slot = ph.next_record_slot(cursor.slot_no);
            ph.unpin(false)?;

            match next_slot {
                Some(slot_no) => {
                    cursor.slot_no = Some(slot_no);
                    return Ok(());
                }
                None => {
                    cursor.page_no += 1;
                    cursor.slot_no = None;
                }
            }
        }

        self.cursor = None;
        Ok(())
    }
}

impl<'a> Iterator for RmScan<'a> {
    type Item = RecordResult<Rid>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }

        let rid = self.rid()?;
        if let Err(err) = self.advance() {
            self.cursor = None;
            self.pending_error = Some(err);
        }
        Some(Ok(rid))
    }
}
