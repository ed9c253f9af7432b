#[cfg(test)]
pub mod test {
    use crate::{
        iterators::{iterator::StorageIterator, rm_scan::RmScan},
        storage::{page::page::PageId, record::rm_defs::Rid},
        tests::{memory_record_file, record_of},
    };

    // 4 slots per page
    const RECORD_SIZE: usize = 1000;

    #[test]
    fn empty_file_scans_nothing() {
        let (_disk, file_handle) = memory_record_file(4, RECORD_SIZE);

        let mut scan = RmScan::new(&file_handle).unwrap();
        assert!(scan.is_end());
        assert!(!scan.is_valid());
        assert_eq!(scan.rid(), None);
        assert_eq!(scan.value(), None);

        // Advancing past the end stays at the end
        scan.advance().unwrap();
        assert!(scan.is_end());
        assert_eq!(scan.count(), 0);
    }

    #[test]
    fn visits_records_in_page_and_slot_order() {
        let (_disk, file_handle) = memory_record_file(4, RECORD_SIZE);

        let rids: Vec<Rid> = (0..12u8)
            .map(|fill| {
                file_handle
                    .insert_record(&record_of(RECORD_SIZE, fill))
                    .unwrap()
            })
            .collect();
        assert_eq!(rids.last(), Some(&Rid::new(3, 3)));

        // Empty out page 2 and punch holes into pages 1 and 3
        for slot_no in 0..4 {
            file_handle.delete_record(Rid::new(2, slot_no)).unwrap();
        }
        file_handle.delete_record(Rid::new(1, 0)).unwrap();
        file_handle.delete_record(Rid::new(3, 2)).unwrap();

        let expected = vec![
            Rid::new(1, 1),
            Rid::new(1, 2),
            Rid::new(1, 3),
            Rid::new(3, 0),
            Rid::new(3, 1),
            Rid::new(3, 3),
        ];

        let scanned: Vec<Rid> = RmScan::new(&file_handle)
            .unwrap()
            .map(|rid| rid.unwrap())
            .collect();
        assert_eq!(scanned, expected);

        let mut scan = RmScan::new(&file_handle).unwrap();
        let mut visited = Vec::new();
        while scan.is_valid() {
            let rid = scan.value().unwrap();
            let record = file_handle.get_record(rid).unwrap();
            assert_eq!(record.data[0] as usize, (rid.page_no as usize - 1) * 4 + rid.slot_no);
            visited.push(rid);
            scan.advance().unwrap();
        }
        assert_eq!(visited, expected);

        // The scan leaves nothing pinned
        let bpm = file_handle.buffer_pool();
        for page_no in 1..file_handle.file_hdr().num_pages {
            let pin_count = bpm.pin_count(PageId::new(file_handle.file_id(), page_no));
            assert!(matches!(pin_count, None | Some(0)));
        }
    }

    #[test]
    fn single_frame_pool_is_enough() {
        let (_disk, file_handle) = memory_record_file(1, RECORD_SIZE);

        for fill in 0..9u8 {
            file_handle
                .insert_record(&record_of(RECORD_SIZE, fill))
                .unwrap();
        }

        let scanned: Vec<Rid> = RmScan::new(&file_handle)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(scanned.len(), 9);
        assert_eq!(scanned[8], Rid::new(3, 0));
        assert!(scanned.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
