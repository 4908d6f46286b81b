//! Type identifiers for LoamDB column values.

use serde::{Deserialize, Serialize};

/// Identifier for the column types the storage layer can serialize.
///
/// Type ids are carried by schemas to drive tuple construction; the page
/// layer itself never inspects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeId {
    /// One-byte boolean.
    Boolean = 1,
    /// 32-bit signed integer.
    Integer = 2,
    /// 64-bit signed integer.
    BigInt = 3,
    /// Variable-length byte string.
    Varchar = 4,
}

impl TypeId {
    /// Returns the fixed byte size for this type, or None for
    /// variable-length types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            TypeId::Boolean => Some(1),
            TypeId::Integer => Some(4),
            TypeId::BigInt => Some(8),
            TypeId::Varchar => None,
        }
    }

    /// Returns true if this type has a fixed byte size.
    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }
}
