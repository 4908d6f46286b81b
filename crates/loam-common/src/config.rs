//! Configuration structures for LoamDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for a LoamDB instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for data files.
    pub data_dir: PathBuf,
    /// Path of the write-ahead log file. None runs the engine unlogged
    /// (bulk load, tests).
    pub wal_path: Option<PathBuf>,
    /// Buffer pool size in number of page frames.
    pub buffer_pool_frames: usize,
    /// Enable fsync for durability.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            wal_path: Some(PathBuf::from("./data/loam.wal")),
            buffer_pool_frames: 1024,
            fsync_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Returns the total buffer pool size in bytes.
    pub fn buffer_pool_size_bytes(&self) -> usize {
        self.buffer_pool_frames * crate::page::PAGE_SIZE
    }
}
