#[cfg(test)]
pub mod test {
    use std::{fs::remove_dir_all, path::PathBuf};

    use crate::{
        engine::{StorageEngine, StorageOptions, DATA_DIR_ENV, DEFAULT_POOL_SIZE, POOL_SIZE_ENV},
        errors::RecordError,
        iterators::rm_scan::RmScan,
        storage::{
            page::page::page_constants::PAGE_SIZE,
            record::rm_defs::{rm_constants::RM_MAX_RECORD_SIZE, Rid},
        },
    };

    // A fresh directory per test so parallel tests never share files
    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "geode_storage_{}_{}",
            std::process::id(),
            name
        ));
        let _ = remove_dir_all(&dir);
        dir
    }

    fn record(fill: u8) -> Vec<u8> {
        vec![fill; 64]
    }

    #[test]
    fn records_survive_close_and_reopen() {
        let dir = test_dir("reopen");
        let options = StorageOptions::default()
            .with_pool_size(4)
            .with_data_dir(&dir);

        let rids: Vec<Rid> = {
            let engine = StorageEngine::open(options.clone()).unwrap();
            engine.create_file("people.db", 64).unwrap();
            assert!(engine.file_exists("people.db"));

            let file_handle = engine.open_file("people.db").unwrap();
            assert_eq!(file_handle.record_size(), 64);
            let rids = (0..200u8)
                .map(|fill| file_handle.insert_record(&record(fill)).unwrap())
                .collect::<Vec<_>>();
            file_handle.delete_record(rids[10]).unwrap();
            engine.close_file(file_handle).unwrap();
            rids
        };

        let engine = StorageEngine::open(options).unwrap();
        let file_handle = engine.open_file("people.db").unwrap();
        let file_hdr = file_handle.file_hdr();
        assert_eq!(file_hdr.record_size, 64);
        assert!(file_hdr.num_pages > 1);

        for (fill, rid) in rids.iter().enumerate() {
            if fill == 10 {
                assert!(matches!(
                    file_handle.get_record(*rid),
                    Err(RecordError::RecordNotFound { .. })
                ));
                continue;
            }
            assert_eq!(file_handle.get_record(*rid).unwrap().data, record(fill as u8));
        }

        let scanned = RmScan::new(&file_handle).unwrap().count();
        assert_eq!(scanned, 199);

        // The freed slot is reused first
        assert_eq!(file_handle.insert_record(&record(0xaa)).unwrap(), rids[10]);
        engine.close_file(file_handle).unwrap();

        remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_lifecycle_errors() {
        let dir = test_dir("lifecycle");
        let engine =
            StorageEngine::open(StorageOptions::default().with_data_dir(&dir)).unwrap();
        assert_eq!(engine.options().data_dir, dir);
        assert_eq!(engine.options().pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(engine.buffer_pool().pool_size(), DEFAULT_POOL_SIZE);

        assert!(matches!(
            engine.create_file("bad.db", 0),
            Err(RecordError::InvalidRecordSize(0))
        ));
        assert!(matches!(
            engine.create_file("bad.db", RM_MAX_RECORD_SIZE + 1),
            Err(RecordError::InvalidRecordSize(_))
        ));
        assert!(!engine.file_exists("bad.db"));

        engine.create_file("t.db", PAGE_SIZE / 2).unwrap();
        assert!(engine.create_file("t.db", 8).is_err());
        assert!(engine.open_file("missing.db").is_err());

        let file_handle = engine.open_file("t.db").unwrap();
        assert_eq!(file_handle.file_hdr().num_records_per_page, 1);
        // Open files cannot be opened twice or destroyed
        assert!(engine.open_file("t.db").is_err());
        assert!(engine.destroy_file("t.db").is_err());

        engine.close_file(file_handle).unwrap();
        engine.destroy_file("t.db").unwrap();
        assert!(!engine.file_exists("t.db"));
        assert!(engine.destroy_file("t.db").is_err());

        remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn close_releases_the_pool() {
        let dir = test_dir("release");
        let engine = StorageEngine::open(
            StorageOptions::default()
                .with_pool_size(3)
                .with_data_dir(&dir),
        )
        .unwrap();
        engine.create_file("a.db", 512).unwrap();

        let file_handle = engine.open_file("a.db").unwrap();
        for fill in 0..20u8 {
            file_handle.insert_record(&vec![fill; 512]).unwrap();
        }
        engine.close_file(file_handle).unwrap();

        let bpm = engine.buffer_pool();
        assert_eq!(bpm.free_frames(), bpm.pool_size());
        assert_eq!(bpm.replacer_size(), 0);

        remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn options_from_env() {
        let defaults = StorageOptions::default();
        assert_eq!(defaults.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(defaults.data_dir, PathBuf::from("geodeData"));

        std::env::set_var(POOL_SIZE_ENV, "16");
        std::env::set_var(DATA_DIR_ENV, "/tmp/geode_env_dir");
        let options = StorageOptions::from_env();
        assert_eq!(options.pool_size, 16);
        assert_eq!(options.data_dir, PathBuf::from("/tmp/geode_env_dir"));

        // Unusable values fall back to the defaults
        std::env::set_var(POOL_SIZE_ENV, "zero");
        std::env::set_var(DATA_DIR_ENV, "  ");
        assert_eq!(StorageOptions::from_env(), defaults);

        std::env::remove_var(POOL_SIZE_ENV);
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(StorageOptions::from_env(), defaults);
    }
}
