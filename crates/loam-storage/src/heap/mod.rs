//! Heap storage implementation.
//!
//! - `HeapPage`: slotted page format for variable-length tuples
//! - `HeapFile`: doubly-linked chain of heap pages forming a table
//! - `HeapIterator`: forward cursor over a heap file's live tuples

pub mod constants;
mod file;
mod iterator;
mod page;

pub use file::HeapFile;
pub use iterator::HeapIterator;
pub use page::{HeapPage, PageUpdate};
