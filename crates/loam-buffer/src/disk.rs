//! Disk manager for page-level file I/O.

use loam_common::page::{PageId, PAGE_SIZE};
use loam_common::{LoamError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Name of the page file inside the data directory.
const DATA_FILE_NAME: &str = "loam.dat";

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Base directory for the data file.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

/// Manages reading and writing pages of a single page file.
///
/// Pages are addressed by their page number; the file is extended one page
/// at a time through `allocate_page`.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// Open file handle and page count.
    inner: Mutex<FileHandle>,
}

struct FileHandle {
    file: File,
    num_pages: u32,
}

impl DiskManager {
    /// Creates a new disk manager, opening or creating the page file.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let path = config.data_dir.join(DATA_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            config,
            inner: Mutex::new(FileHandle { file, num_pages }),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> u32 {
        self.inner.lock().num_pages
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        let mut inner = self.inner.lock();

        if page_id.0 >= inner.num_pages {
            return Err(LoamError::PageNotFound { page_id });
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = [0u8; PAGE_SIZE];
        inner.file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Writes a page to disk.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut inner = self.inner.lock();

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;

        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        // Update the page count if the write extended the file
        if page_id.0 >= inner.num_pages {
            inner.num_pages = page_id.0 + 1;
        }

        Ok(())
    }

    /// Allocates a new page at the end of the file.
    ///
    /// Returns the PageId of the newly allocated page.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut inner = self.inner.lock();

        let page_num = inner.num_pages;
        let page_id = PageId(page_num);

        // Write an empty page to extend the file
        let offset = (page_num as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&[0u8; PAGE_SIZE])?;

        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        inner.num_pages = page_num + 1;

        Ok(page_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_disk() -> (DiskManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = DiskManagerConfig {
            data_dir: dir.path().to_path_buf(),
            fsync_enabled: false,
        };
        (DiskManager::new(config).unwrap(), dir)
    }

    #[test]
    fn test_disk_manager_new() {
        let (disk, _dir) = create_test_disk();
        assert_eq!(disk.num_pages(), 0);
    }

    #[test]
    fn test_allocate_page() {
        let (disk, _dir) = create_test_disk();

        assert_eq!(disk.allocate_page().unwrap(), PageId(0));
        assert_eq!(disk.allocate_page().unwrap(), PageId(1));
        assert_eq!(disk.num_pages(), 2);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (disk, _dir) = create_test_disk();

        let page_id = disk.allocate_page().unwrap();
        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0xAB;
        data[PAGE_SIZE - 1] = 0xCD;

        disk.write_page(page_id, &data).unwrap();
        let read = disk.read_page(page_id).unwrap();

        assert_eq!(read[0], 0xAB);
        assert_eq!(read[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn test_read_missing_page() {
        let (disk, _dir) = create_test_disk();

        let result = disk.read_page(PageId(99));
        assert!(matches!(result, Err(LoamError::PageNotFound { .. })));
    }

    #[test]
    fn test_reopen_preserves_pages() {
        let dir = tempdir().unwrap();
        let config = DiskManagerConfig {
            data_dir: dir.path().to_path_buf(),
            fsync_enabled: false,
        };

        let page_id = {
            let disk = DiskManager::new(config.clone()).unwrap();
            let page_id = disk.allocate_page().unwrap();
            let data = [0x5Au8; PAGE_SIZE];
            disk.write_page(page_id, &data).unwrap();
            page_id
        };

        let disk = DiskManager::new(config).unwrap();
        assert_eq!(disk.num_pages(), 1);
        assert_eq!(disk.read_page(page_id).unwrap()[100], 0x5A);
    }
}
