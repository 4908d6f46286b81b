//! Heap page layout constants.

use loam_common::page::PAGE_SIZE;

/// Byte offset of the page id in the header.
pub const OFFSET_PAGE_ID: usize = 0;
/// Byte offset of the page LSN in the header.
pub const OFFSET_LSN: usize = 4;
/// Byte offset of the previous page id in the header.
pub const OFFSET_PREV_PAGE_ID: usize = 8;
/// Byte offset of the next page id in the header.
pub const OFFSET_NEXT_PAGE_ID: usize = 12;
/// Byte offset of the free space pointer in the header.
pub const OFFSET_FREE_SPACE_POINTER: usize = 16;
/// Byte offset of the tuple count in the header.
pub const OFFSET_TUPLE_COUNT: usize = 20;

/// Size of the page header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Size of a slot directory entry: (offset: u32, size: u32).
pub const SLOT_SIZE: usize = 8;

/// High bit of a slot's size field marks the tuple as deleted.
pub const DELETE_MASK: u32 = 1 << 31;

/// Largest tuple a fresh page can hold: one slot entry plus the payload.
pub const MAX_TUPLE_SIZE: usize = PAGE_SIZE - HEADER_SIZE - SLOT_SIZE;
