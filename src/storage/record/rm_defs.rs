use byteorder::{ByteOrder, LittleEndian};

use rm_constants::{
    BITMAP_SIZE_OFFSET, FIRST_FREE_PAGE_OFFSET, NEXT_FREE_PAGE_OFFSET, NUM_PAGES_OFFSET,
    NUM_RECORDS_OFFSET, RECORDS_PER_PAGE_OFFSET, RECORD_SIZE_OFFSET, RM_MAX_RECORD_SIZE,
    RM_NO_PAGE, RM_PAGE_HDR_SIZE,
};

use crate::{
    errors::{RecordError, RecordResult},
    storage::page::page::{page_constants::PAGE_SIZE, PageNo},
    utils::bitmap,
};

pub mod rm_constants {
    use crate::storage::page::page::{page_constants::PAGE_SIZE, PageNo};

    // Page 0 of a record file holds the file header
    pub const RM_FILE_HDR_PAGE: PageNo = 0;
    pub const RM_FIRST_RECORD_PAGE: PageNo = 1;

    // On-disk encoding of "no page"
    pub const RM_NO_PAGE: i32 = -1;

    // File header layout, little endian
    pub const RECORD_SIZE_OFFSET: usize = 0;
    pub const RECORDS_PER_PAGE_OFFSET: usize = 4;
    pub const NUM_PAGES_OFFSET: usize = 8;
    pub const FIRST_FREE_PAGE_OFFSET: usize = 12;
    pub const BITMAP_SIZE_OFFSET: usize = 16;
    pub const RM_FILE_HDR_SIZE: usize = 20;

    // Data page header layout, followed by the bitmap and the slots
    pub const NEXT_FREE_PAGE_OFFSET: usize = 0;
    pub const NUM_RECORDS_OFFSET: usize = 4;
    pub const RM_PAGE_HDR_SIZE: usize = 8;

    // One slot plus one bitmap byte must fit
    pub const RM_MAX_RECORD_SIZE: usize = PAGE_SIZE - RM_PAGE_HDR_SIZE - 1;
}

fn encode_page_no(page_no: Option<PageNo>) -> i32 {
    page_no.map_or(RM_NO_PAGE, |page_no| page_no as i32)
}

fn decode_page_no(raw: i32) -> Option<PageNo> {
    if raw < 0 {
        None
    } else {
        Some(raw as PageNo)
    }
}

/// Record file header, persisted in page 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmFileHdr {
    pub record_size: usize,
    pub num_records_per_page: usize,
    // Including the header page
    pub num_pages: PageNo,
    pub first_free_page_no: Option<PageNo>,
    pub bitmap_size: usize,
}

impl RmFileHdr {
    pub fn new(record_size: usize) -> RecordResult<Self> {
        if record_size == 0 || record_size > RM_MAX_RECORD_SIZE {
            return Err(RecordError::InvalidRecordSize(record_size));
        }

        let num_records_per_page = records_per_page(record_size);
        if num_records_per_page == 0 {
            return Err(RecordError::InvalidRecordSize(record_size));
        }

        Ok(RmFileHdr {
            record_size,
            num_records_per_page,
            num_pages: 1,
            first_free_page_no: None,
            bitmap_size: bitmap::bytes_for(num_records_per_page),
        })
    }

    pub fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[RECORD_SIZE_OFFSET..], self.record_size as u32);
        LittleEndian::write_u32(
            &mut buf[RECORDS_PER_PAGE_OFFSET..],
            self.num_records_per_page as u32,
        );
        LittleEndian::write_u32(&mut buf[NUM_PAGES_OFFSET..], self.num_pages);
        LittleEndian::write_i32(
            &mut buf[FIRST_FREE_PAGE_OFFSET..],
            encode_page_no(self.first_free_page_no),
        );
        LittleEndian::write_u32(&mut buf[BITMAP_SIZE_OFFSET..], self.bitmap_size as u32);
    }

    pub fn decode(buf: &[u8]) -> RecordResult<Self> {
        let record_size = LittleEndian::read_u32(&buf[RECORD_SIZE_OFFSET..]) as usize;
        let expected = RmFileHdr::new(record_size)?;

        let file_hdr = RmFileHdr {
            record_size,
            num_records_per_page: LittleEndian::read_u32(&buf[RECORDS_PER_PAGE_OFFSET..]) as usize,
            num_pages: LittleEndian::read_u32(&buf[NUM_PAGES_OFFSET..]),
            first_free_page_no: decode_page_no(LittleEndian::read_i32(
                &buf[FIRST_FREE_PAGE_OFFSET..],
            )),
            bitmap_size: LittleEndian::read_u32(&buf[BITMAP_SIZE_OFFSET..]) as usize,
        };

        if file_hdr.num_records_per_page != expected.num_records_per_page
            || file_hdr.bitmap_size != expected.bitmap_size
            || file_hdr.num_pages == 0
        {
            return Err(RecordError::Io(anyhow::anyhow!(
                "corrupted record file header: {:?}",
                file_hdr
            )));
        }

        Ok(file_hdr)
    }

    pub fn bitmap_offset(&self) -> usize {
        RM_PAGE_HDR_SIZE
    }

    pub fn slot_offset(&self, slot_no: usize) -> usize {
        RM_PAGE_HDR_SIZE + self.bitmap_size + slot_no * self.record_size
    }
}

// Largest n with header + ceil(n / 8) + n * record_size <= PAGE_SIZE.
fn records_per_page(record_size: usize) -> usize {
    let available = PAGE_SIZE - RM_PAGE_HDR_SIZE;
    let mut n = (available * bitmap::BITMAP_WIDTH) / (record_size * bitmap::BITMAP_WIDTH + 1);
    while n > 0 && bitmap::bytes_for(n) + n * record_size > available {
        n -= 1;
    }
    n
}

/// Header at the start of every data page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmPageHdr {
    pub next_free_page_no: Option<PageNo>,
    pub num_records: usize,
}

impl RmPageHdr {
    pub fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_i32(
            &mut buf[NEXT_FREE_PAGE_OFFSET..],
            encode_page_no(self.next_free_page_no),
        );
        LittleEndian::write_u32(&mut buf[NUM_RECORDS_OFFSET..], self.num_records as u32);
    }

    pub fn decode(buf: &[u8]) -> Self {
        RmPageHdr {
            next_free_page_no: decode_page_no(LittleEndian::read_i32(
                &buf[NEXT_FREE_PAGE_OFFSET..],
            )),
            num_records: LittleEndian::read_u32(&buf[NUM_RECORDS_OFFSET..]) as usize,
        }
    }
}

/// Location of a record: data page number and slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    pub page_no: PageNo,
    pub slot_no: usize,
}

impl Rid {
    pub fn new(page_no: PageNo, slot_no: usize) -> Self {
        Rid { page_no, slot_no }
    }
}

/// An owned copy of one record's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: Vec<u8>,
}

impl Record {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
pub mod test {
    use super::{rm_constants::RM_PAGE_HDR_SIZE, RmFileHdr, RmPageHdr};
    use crate::{
        errors::RecordError,
        storage::{disk::manager::MAX_PAGES_PER_FILE, page::page::page_constants::PAGE_SIZE},
    };

    #[test]
    fn slots_fill_the_page() {
        for record_size in [1usize, 7, 8, 100, 1000, 4000] {
            let hdr = RmFileHdr::new(record_size).unwrap();
            let n = hdr.num_records_per_page;
            assert!(n >= 1);
            assert!(hdr.slot_offset(n) <= PAGE_SIZE, "size {}", record_size);
            // One more slot would not fit
            let more = RM_PAGE_HDR_SIZE + (n + 1 + 7) / 8 + (n + 1) * record_size;
            assert!(more > PAGE_SIZE, "size {}", record_size);
        }

        assert!(matches!(
            RmFileHdr::new(0),
            Err(RecordError::InvalidRecordSize(0))
        ));
        assert!(RmFileHdr::new(PAGE_SIZE).is_err());
    }

    #[test]
    fn headers_survive_encoding() {
        let mut hdr = RmFileHdr::new(64).unwrap();
        hdr.num_pages = 9;
        hdr.first_free_page_no = Some(4);

        let mut buf = vec![0u8; PAGE_SIZE];
        hdr.encode(&mut buf);
        assert_eq!(RmFileHdr::decode(&buf).unwrap(), hdr);

        hdr.first_free_page_no = None;
        hdr.encode(&mut buf);
        assert_eq!(RmFileHdr::decode(&buf).unwrap().first_free_page_no, None);

        let page_hdr = RmPageHdr {
            next_free_page_no: Some(3),
            num_records: 12,
        };
        page_hdr.encode(&mut buf);
        assert_eq!(RmPageHdr::decode(&buf), page_hdr);

        // The last page number a file can hand out still links
        let last = RmPageHdr {
            next_free_page_no: Some(MAX_PAGES_PER_FILE - 1),
            num_records: 0,
        };
        last.encode(&mut buf);
        assert_eq!(RmPageHdr::decode(&buf), last);

        hdr.first_free_page_no = Some(MAX_PAGES_PER_FILE - 1);
        hdr.encode(&mut buf);
        assert_eq!(
            RmFileHdr::decode(&buf).unwrap().first_free_page_no,
            Some(MAX_PAGES_PER_FILE - 1)
        );
    }
}
