//! Sequential reader for WAL files.

use crate::record::LogRecord;
use loam_common::{LoamError, Result};
use std::path::Path;

/// Reads every record from a log file, in append order.
///
/// Fails with `WalCorrupted` (carrying the file offset) on the first
/// malformed or checksum-failing record.
pub fn read_log_file(path: &Path) -> Result<Vec<LogRecord>> {
    let buf = std::fs::read(path)?;
    let mut records = Vec::new();
    let mut pos = 0usize;

    while pos < buf.len() {
        let record = LogRecord::deserialize(&buf[pos..]).map_err(|e| match e {
            LoamError::WalCorrupted { reason, .. } => LoamError::WalCorrupted {
                offset: pos as u64,
                reason,
            },
            other => other,
        })?;
        pos += record.size_on_disk();
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::LogManager;
    use crate::record::{LogRecordKind, Lsn};
    use bytes::Bytes;
    use loam_common::page::PageId;
    use loam_common::rid::Rid;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_back_appended_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("read.wal");
        let log = LogManager::with_file(&path, false).unwrap();

        let rid = Rid::new(PageId(2), 4);
        log.append_log_record(LogRecord::begin(9));
        log.append_log_record(LogRecord::insert(
            9,
            Lsn(1),
            rid,
            Bytes::from_static(b"abc"),
        ));
        log.append_log_record(LogRecord::commit(9, Lsn(2)));
        log.flush().unwrap();

        let records = read_log_file(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, LogRecordKind::Begin);
        assert_eq!(records[1].kind, LogRecordKind::Insert);
        assert_eq!(records[1].rid, rid);
        assert_eq!(records[1].new_image.as_deref(), Some(b"abc".as_ref()));
        assert_eq!(records[2].lsn, Lsn(3));
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wal");
        std::fs::File::create(&path).unwrap();

        assert!(read_log_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corruption_reports_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.wal");
        let log = LogManager::with_file(&path, false).unwrap();

        log.append_log_record(LogRecord::begin(1));
        log.flush().unwrap();

        // Append garbage after the valid record
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(&[0xFFu8; 40]).unwrap();

        let err = read_log_file(&path).unwrap_err();
        match err {
            LoamError::WalCorrupted { offset, .. } => assert!(offset > 0),
            other => panic!("unexpected error: {other}"),
        }
    }
}
