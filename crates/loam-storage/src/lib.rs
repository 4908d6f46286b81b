//! Storage engine for LoamDB.
//!
//! This crate provides:
//! - Heap pages: slotted page format for variable-length tuples
//! - HeapFile: a doubly-linked chain of heap pages forming a table
//! - A forward iterator over a heap file's live tuples
//! - Tuple representation and serialization, with a minimal value/schema
//!   layer driving tuple construction
//!
//! Every page mutation emits a write-ahead log record through `loam-wal`
//! before its bytes become visible; page access goes through the
//! `loam-buffer` pool following the pin/unpin discipline.

mod heap;
mod schema;
mod tuple;
mod value;

pub use heap::{HeapFile, HeapIterator, HeapPage, PageUpdate};
pub use schema::{Column, Schema};
pub use tuple::Tuple;
pub use value::{Value, VARLEN_NULL};
