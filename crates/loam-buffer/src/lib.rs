//! Buffer pool management for LoamDB.
//!
//! This crate provides in-memory page caching backed by a page file:
//! - Fixed-size buffer pool with configurable frame count
//! - Least-recently-unpinned eviction with write-back of dirty victims
//! - Pin counting for concurrent access
//! - Synchronous page-level disk I/O

mod disk;
mod frame;
mod page_table;
mod pool;
mod replacer;

pub use disk::{DiskManager, DiskManagerConfig};
pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPoolConfig, BufferPoolManager};
pub use replacer::{LruReplacer, Replacer};
